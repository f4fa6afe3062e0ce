use anyhow::Context;
use axum::{Router, middleware, routing::get};
use cc_api::{
    config::ApiConfig,
    metrics::{init_metrics, metrics_handler, track_metrics},
    middleware::{
        cors::create_cors_layer, request_id::request_id_middleware,
        security_headers::apply_security_headers,
    },
    state::ApiState,
};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    cc_api::tracing::init_tracing(&config.env);
    let metrics_handle = init_metrics()?;

    let pool = cc_db::create_pool(&config.database_url, config.db_max_connections).await?;
    cc_db::ensure_db_and_migrate(&config.database_url, &pool).await?;
    cc_db::seed::seed_badge_catalog(&pool)
        .await
        .context("failed to seed badge catalog")?;

    let state = ApiState::new(&config, pool)?;

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = cc_api::router::router()
        .with_state(state)
        .merge(metrics_router)
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer(config.parsed_allowed_origins()));
    let app = apply_security_headers(app, config.env.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
