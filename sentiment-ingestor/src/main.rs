use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use common_kafka::config::ConsumerConfig;
use common_kafka::kafka_consumer::BatchConsumer;
use common_metrics::setup_metrics_routes;
use common_types::Event;
use envconfig::Envconfig;
use health::HealthRegistry;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use sentiment_ingestor::app_context::AppContext;
use sentiment_ingestor::config::Config;
use sentiment_ingestor::metrics_consts::{RECORDS_SKIPPED, TICKS_ABANDONED, TICK_TIME};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

pub async fn index() -> &'static str {
    "sentiment ingestor service"
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

    info!("shutdown requested, finishing in-flight tick");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("Starting up...");

    ConsumerConfig::set_defaults("sentiment-ingestor", "discussion_events");
    let config = Config::init_from_env()?;

    let consumer = BatchConsumer::new(config.kafka.clone(), config.consumer.clone())?;
    let context = Arc::new(AppContext::new(&config).await?);

    info!(
        "Subscribed to topic: {}",
        config.consumer.kafka_consumer_topic
    );

    start_health_liveness_server(&config, context.liveness.clone());

    let mut interval = tokio::time::interval(Duration::from_secs(config.tick_interval_secs));
    // Ticks never overlap: the loop below finishes one batch, checkpoint
    // included, before it can wait for the next tick.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {}
        }

        context.worker_liveness.report_healthy().await;

        let batch = consumer
            .drain_ready::<Event>(
                config.max_batch_size,
                Duration::from_millis(config.drain_idle_ms),
            )
            .await?;
        if batch.skipped > 0 {
            metrics::counter!(RECORDS_SKIPPED).increment(batch.skipped);
        }

        let (events, offsets): (Vec<_>, Vec<_>) = batch.records.into_iter().unzip();

        let tick_time = common_metrics::timing_guard(TICK_TIME, &[]);
        match context.ingestor.process_batch(events).await {
            Ok(outcome) => {
                // Persisted: the checkpoint may advance past this batch
                for offset in offsets {
                    offset.store()?;
                }
                if outcome.enrichment_failures > 0 {
                    info!(
                        "tick complete with {} unenriched comments",
                        outcome.enrichment_failures
                    );
                }
                tick_time.label("outcome", "ok").fin();
            }
            Err(e) => {
                metrics::counter!(TICKS_ABANDONED).increment(1);
                error!("tick abandoned, batch will be redelivered: {}", e);
                consumer.rewind(&offsets)?;
                tick_time.label("outcome", "abandoned").fin();
            }
        }
    }

    info!("sentiment ingestor stopped");
    Ok(())
}
