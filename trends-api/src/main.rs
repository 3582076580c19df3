use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::Duration;
use common_metrics::setup_metrics_routes;
use common_store::PostgresStore;
use envconfig::Envconfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use trends_api::api::{apply_routes, AppState};
use trends_api::config::Config;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

pub async fn index() -> &'static str {
    "trends api service"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env()?;

    let store = PostgresStore::new(&config.database_url, config.max_pg_connections).await?;
    store.run_migrations().await?;

    let state = Arc::new(AppState {
        store: Arc::new(store),
        rolling_window: Duration::seconds(config.rolling_window_secs as i64),
    });

    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(index));
    let router = apply_routes(router, state);
    let router = setup_metrics_routes(router);

    let bind = format!("{}:{}", config.host, config.port);
    info!("Serving aggregation queries on {}", bind);
    common_metrics::serve(router, &bind).await?;

    Ok(())
}
