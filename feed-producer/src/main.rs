use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use common_metrics::setup_metrics_routes;
use common_store::PostgresStore;
use envconfig::Envconfig;
use health::HealthRegistry;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use feed_producer::config::Config;
use feed_producer::dedup::{MemoryLedger, PostgresLedger, SubmissionLedger};
use feed_producer::feed::HttpCommentFeed;
use feed_producer::producer::FeedProducer;
use feed_producer::sink::KafkaSink;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

pub async fn index() -> &'static str {
    "feed producer service"
}

fn start_health_liveness_server(config: &Config, liveness: HealthRegistry) -> JoinHandle<()> {
    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route("/_liveness", get(move || std::future::ready(liveness.get_status())));
    let router = setup_metrics_routes(router);
    let bind = format!("{}:{}", config.host, config.port);
    tokio::task::spawn(async move {
        common_metrics::serve(router, &bind)
            .await
            .expect("failed to start serving metrics");
    })
}

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env()?;

    let liveness = HealthRegistry::new("liveness");
    let sink_liveness = liveness
        .register("rdkafka".to_string(), Duration::from_secs(30))
        .await;
    let producer_liveness = liveness
        .register("producer".to_string(), Duration::from_secs(60))
        .await;

    start_health_liveness_server(&config, liveness.clone());

    let sink = KafkaSink::new(
        config.kafka.clone(),
        config.events_topic.clone(),
        sink_liveness,
    )
    .await?;

    let ledger: Arc<dyn SubmissionLedger> = match &config.ledger_database_url {
        Some(url) => {
            let store = PostgresStore::new(url, config.ledger_max_connections).await?;
            store.run_migrations().await?;
            Arc::new(PostgresLedger::new(store.pool().clone()))
        }
        None => Arc::new(MemoryLedger::new()),
    };

    let feed = HttpCommentFeed::new(config.feed_endpoint.clone(), config.feed_channel.clone())?;

    info!(
        "Following channel {} into topic {}",
        config.feed_channel, config.events_topic
    );

    let producer = FeedProducer::new(
        feed,
        ledger,
        sink,
        producer_liveness,
        Duration::from_millis(config.feed_poll_interval_ms),
    );

    producer.run(shutdown()).await;
    Ok(())
}
