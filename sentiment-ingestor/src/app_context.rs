use std::sync::Arc;
use std::time::Duration;

use common_store::PostgresStore;
use health::{HealthHandle, HealthRegistry};

use crate::config::Config;
use crate::enrichment::HttpSentimentClient;
use crate::ingestor::Ingestor;
use crate::topics::{HttpTopicAssigner, NoopAssigner, TopicAssigner};

pub struct AppContext {
    pub ingestor: Ingestor,
    pub liveness: HealthRegistry,
    pub worker_liveness: HealthHandle,
}

impl AppContext {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store = PostgresStore::new(&config.database_url, config.max_pg_connections).await?;
        store.run_migrations().await?;

        let enricher = HttpSentimentClient::new(
            config.enrichment_url.clone(),
            Duration::from_millis(config.enrichment_timeout_ms),
        )?;

        let assigner: Arc<dyn TopicAssigner> = match &config.topic_model_url {
            Some(url) => Arc::new(HttpTopicAssigner::new(
                url.clone(),
                Duration::from_millis(config.topic_model_timeout_ms),
            )?),
            None => Arc::new(NoopAssigner),
        };

        let liveness = HealthRegistry::new("liveness");
        let worker_liveness = liveness
            .register(
                "ingestor".to_string(),
                // Two tick intervals without a report means the loop is wedged
                Duration::from_secs(config.tick_interval_secs * 2 + 30),
            )
            .await;

        let ingestor = Ingestor::new(
            Arc::new(store),
            Arc::new(enricher),
            assigner,
            config.enrichment_concurrency,
        );

        Ok(Self {
            ingestor,
            liveness,
            worker_liveness,
        })
    }
}
