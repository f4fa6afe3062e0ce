#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Router,
    body::Body,
    extract::FromRef,
    http::{Request, StatusCode},
};
use axum_extra::extract::cookie::Key;
use cc_api::gamification::{
    GamificationEngine, MemoryProgressStore, MemoryProgressTx, ProgressStore, ProgressTx,
    StoreError, routes,
};
use cc_api::{auth::jwt::generate_jwt_token, config::Environment, state::AuthConfig};
use cc_db::models::{Badge, EarnedBadge, QuizScore, UserProgress};
use cc_gamify::{Clock, RequirementType};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use serde::Deserialize;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_jwt_secret_minimum_32_characters_long";
pub const COOKIE_SECRET: &str =
    "test_cookie_secret_minimum_64_characters_long_for_secure_encryption";

pub type TestEngine<S = MemoryProgressStore> = GamificationEngine<S, ManualClock>;

/// Clock whose calendar day only moves when a test says so
#[derive(Clone, Debug)]
pub struct ManualClock {
    today: Arc<Mutex<NaiveDate>>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Arc::new(Mutex::new(today)),
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        *self.today.lock().unwrap() = today;
    }

    pub fn advance_days(&self, days: i64) {
        let mut today = self.today.lock().unwrap();
        *today += Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.today().and_hms_opt(12, 0, 0).unwrap().and_utc()
    }

    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn quiz(quiz_id: i64, score: i32, minute: u32) -> QuizScore {
    QuizScore {
        quiz_id,
        score,
        passed: score >= 70,
        completed_at: Utc.with_ymd_and_hms(2025, 3, 10, 9, minute, 0).unwrap(),
    }
}

/// An engine over an empty in-memory store, pinned to 2025-03-15
pub struct TestHarness {
    pub store: MemoryProgressStore,
    pub clock: ManualClock,
    pub engine: TestEngine,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = MemoryProgressStore::new();
        let clock = ManualClock::new(date(2025, 3, 15));
        let engine = GamificationEngine::with_clock(store.clone(), clock.clone());
        Self {
            store,
            clock,
            engine,
        }
    }

    /// Register a fresh user (XP 0, level 1, no streak)
    pub async fn new_user(&self, user_id: i64) {
        self.store
            .insert_user_progress(UserProgress::new(user_id))
            .await;
    }

    /// Register a user whose last counted login was `days_ago` days before today
    pub async fn user_with_streak(&self, user_id: i64, streak: i32, days_ago: i64) {
        let mut progress = UserProgress::new(user_id);
        progress.daily_streak = streak;
        progress.last_login_date = Some(self.clock.today() - Duration::days(days_ago));
        self.store.insert_user_progress(progress).await;
    }

    /// Engine sharing this harness's data and clock whose first `conflicts`
    /// commits fail with a write conflict
    pub fn conflicting_engine(&self, conflicts: usize) -> TestEngine<ConflictingStore> {
        let store = ConflictingStore::new(self.store.clone(), conflicts);
        GamificationEngine::with_clock(store, self.clock.clone())
    }

    pub fn client(&self) -> TestClient {
        client_for(self.engine.clone())
    }
}

/// HTTP client over the gamification routes of `engine`
pub fn client_for<S: ProgressStore>(engine: TestEngine<S>) -> TestClient {
    let state = TestState {
        engine,
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            environment: Environment::Development,
        },
        cookie_key: Key::from(COOKIE_SECRET.as_bytes()),
    };
    let router = routes::<TestState<S>, S, ManualClock>().with_state(state);
    TestClient::new(router)
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Router state for HTTP tests
#[derive(Clone)]
pub struct TestState<S = MemoryProgressStore> {
    pub engine: TestEngine<S>,
    pub auth: AuthConfig,
    pub cookie_key: Key,
}

impl<S: ProgressStore> FromRef<TestState<S>> for TestEngine<S> {
    fn from_ref(state: &TestState<S>) -> Self {
        state.engine.clone()
    }
}

impl<S> FromRef<TestState<S>> for AuthConfig {
    fn from_ref(state: &TestState<S>) -> Self {
        state.auth.clone()
    }
}

impl<S> FromRef<TestState<S>> for Key {
    fn from_ref(state: &TestState<S>) -> Self {
        state.cookie_key.clone()
    }
}

/// In-memory store whose next commits fail with a write conflict.
///
/// A failed commit drops the transaction, so nothing it staged is applied.
#[derive(Clone, Debug)]
pub struct ConflictingStore {
    inner: MemoryProgressStore,
    conflicts_left: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl ConflictingStore {
    pub fn new(inner: MemoryProgressStore, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts_left: Arc::new(AtomicUsize::new(conflicts)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Transactions begun so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn conflicts_left(&self) -> usize {
        self.conflicts_left.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ConflictingTx {
    inner: MemoryProgressTx,
    conflicts_left: Arc<AtomicUsize>,
}

impl ProgressStore for ConflictingStore {
    type Tx = ConflictingTx;

    async fn begin(&self) -> Result<ConflictingTx, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(ConflictingTx {
            inner: self.inner.begin().await?,
            conflicts_left: Arc::clone(&self.conflicts_left),
        })
    }

    async fn load_user_progress(&self, user_id: i64) -> Result<Option<UserProgress>, StoreError> {
        self.inner.load_user_progress(user_id).await
    }

    async fn earned_badges(&self, user_id: i64) -> Result<Vec<EarnedBadge>, StoreError> {
        self.inner.earned_badges(user_id).await
    }

    async fn count_completed_materials(&self, user_id: i64) -> Result<i64, StoreError> {
        self.inner.count_completed_materials(user_id).await
    }

    async fn completed_material_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        self.inner.completed_material_ids(user_id).await
    }

    async fn count_quiz_attempts(&self, user_id: i64) -> Result<i64, StoreError> {
        self.inner.count_quiz_attempts(user_id).await
    }

    async fn average_quiz_score(&self, user_id: i64) -> Result<f64, StoreError> {
        self.inner.average_quiz_score(user_id).await
    }

    async fn best_quiz_score(&self, user_id: i64) -> Result<Option<i32>, StoreError> {
        self.inner.best_quiz_score(user_id).await
    }

    async fn recent_quiz_scores(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<QuizScore>, StoreError> {
        self.inner.recent_quiz_scores(user_id, limit).await
    }
}

impl ProgressTx for ConflictingTx {
    async fn lock_user_progress(
        &mut self,
        user_id: i64,
    ) -> Result<Option<UserProgress>, StoreError> {
        self.inner.lock_user_progress(user_id).await
    }

    async fn save_user_progress(&mut self, progress: &UserProgress) -> Result<(), StoreError> {
        self.inner.save_user_progress(progress).await
    }

    async fn load_badge_catalog(
        &mut self,
        requirement_type: RequirementType,
        max_value: i64,
    ) -> Result<Vec<Badge>, StoreError> {
        self.inner
            .load_badge_catalog(requirement_type, max_value)
            .await
    }

    async fn has_grant(&mut self, user_id: i64, badge_id: i64) -> Result<bool, StoreError> {
        self.inner.has_grant(user_id, badge_id).await
    }

    async fn create_grant(
        &mut self,
        user_id: i64,
        badge_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.create_grant(user_id, badge_id, earned_at).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        let decrement = |left: usize| left.checked_sub(1);
        let conflicted = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, decrement)
            .is_ok();
        if conflicted {
            return Err(StoreError::Conflict);
        }
        self.inner.commit().await
    }
}

pub fn create_test_token(user_id: i64, email: &str) -> String {
    generate_jwt_token(user_id, email.to_string(), JWT_SECRET, 24)
        .expect("Failed to generate test token")
}

/// Encrypt the auth token the way `PrivateCookieJar` expects it
fn auth_cookie_header(token: &str) -> String {
    use cookie::{CookieJar as RawCookieJar, Key as RawKey};

    let raw_key = RawKey::try_from(COOKIE_SECRET.as_bytes()).expect("Invalid key");
    let mut raw_jar = RawCookieJar::new();
    raw_jar
        .private_mut(&raw_key)
        .add(cookie::Cookie::new("auth_token", token.to_string()));

    let encrypted = raw_jar.get("auth_token").expect("Cookie should exist");
    format!("{}={}", encrypted.name(), encrypted.value())
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(body).expect("Failed to serialize body"),
            ))
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a GET request with the private auth cookie
    pub async fn get_with_auth(&self, uri: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("cookie", auth_cookie_header(token))
            .body(Body::empty())
            .expect("Failed to build authenticated request");

        self.request(request).await
    }

    /// Send a GET request with an `Authorization: Bearer` header
    pub async fn get_with_bearer(&self, uri: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .expect("Failed to build authenticated request");

        self.request(request).await
    }

    /// Send a POST request with the private auth cookie (no body)
    pub async fn post_with_auth(&self, uri: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("cookie", auth_cookie_header(token))
            .body(Body::empty())
            .expect("Failed to build authenticated request");

        self.request(request).await
    }

    /// Send a POST request with JSON body and the private auth cookie
    pub async fn post_json_with_auth<T: serde::Serialize>(
        &self,
        uri: &str,
        body: &T,
        token: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("cookie", auth_cookie_header(token))
            .body(Body::from(
                serde_json::to_string(body).expect("Failed to serialize body"),
            ))
            .expect("Failed to build authenticated request");

        self.request(request).await
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
