//! Logging setup.
//!
//! Development gets pretty, human-readable output at DEBUG; production gets
//! flattened JSON at INFO for log aggregation. `RUST_LOG` overrides either
//! default (e.g. `RUST_LOG=debug,sqlx=info`).

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

const DEVELOPMENT_FILTER: &str = "debug,tower_http=debug,sqlx=warn";
const PRODUCTION_FILTER: &str = "info,tower_http=info,sqlx=warn";

pub fn init_tracing(env: &Environment) {
    if env.is_development() {
        init_development_tracing();
    } else {
        init_production_tracing();
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_development_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .pretty()
                .with_filter(env_filter(DEVELOPMENT_FILTER)),
        )
        .init();

    tracing::info!("Tracing initialized in development mode");
}

fn init_production_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(true)
                .with_filter(env_filter(PRODUCTION_FILTER)),
        )
        .init();

    tracing::info!("Tracing initialized in production mode");
}
