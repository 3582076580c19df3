use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes

    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 20 seconds

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,
}

#[derive(Envconfig, Clone)]
pub struct ConsumerConfig {
    pub kafka_consumer_group: String,
    pub kafka_consumer_topic: String,

    // We default to "earliest" so a fresh consumer group replays the whole log
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String, // earliest, latest

    // The checkpoint cadence: stored offsets are committed to the broker on
    // this interval. Offsets are only *stored* after a batch is persisted,
    // so committing more often never checkpoints unpersisted work.
    #[envconfig(default = "15000")]
    pub kafka_consumer_commit_interval_ms: i32,
}

impl ConsumerConfig {
    /// Consumer group and topic are application specific, so there are no
    /// good derive-macro defaults. Services set theirs here before init'ing
    /// their main config struct.
    pub fn set_defaults(consumer_group: &str, consumer_topic: &str) {
        if std::env::var("KAFKA_CONSUMER_GROUP").is_err() {
            std::env::set_var("KAFKA_CONSUMER_GROUP", consumer_group);
        }
        if std::env::var("KAFKA_CONSUMER_TOPIC").is_err() {
            std::env::set_var("KAFKA_CONSUMER_TOPIC", consumer_topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_defaults_does_not_override_explicit_env() {
        std::env::set_var("KAFKA_CONSUMER_GROUP", "explicit-group");
        std::env::remove_var("KAFKA_CONSUMER_TOPIC");

        ConsumerConfig::set_defaults("default-group", "default-topic");

        assert_eq!(
            std::env::var("KAFKA_CONSUMER_GROUP").unwrap(),
            "explicit-group"
        );
        assert_eq!(
            std::env::var("KAFKA_CONSUMER_TOPIC").unwrap(),
            "default-topic"
        );
    }
}
