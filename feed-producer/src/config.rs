use common_kafka::config::KafkaConfig;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3301")]
    pub port: u16,

    pub feed_endpoint: String,

    // The discussion channel whose comment stream we follow
    #[envconfig(default = "worldnews")]
    pub feed_channel: String,

    #[envconfig(default = "2000")]
    pub feed_poll_interval_ms: u64,

    #[envconfig(default = "discussion_events")]
    pub events_topic: String,

    // When set, the dedup ledger lives in this database and survives
    // restarts. Without it the ledger is in-memory and a restart may
    // re-emit submissions (at-least-once on the log either way).
    pub ledger_database_url: Option<String>,

    #[envconfig(default = "4")]
    pub ledger_max_connections: u32,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}
