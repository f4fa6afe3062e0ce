pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod service;
pub mod validation;

pub use middleware::AuthUser;
pub use routes::routes;
