use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common_kafka::config::KafkaConfig;
use common_kafka::kafka_producer::{
    create_kafka_producer, send_keyed_group, KafkaContext, KafkaProduceError,
};
use common_types::Event;
use health::HealthHandle;
use rdkafka::producer::FutureProducer;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Produce(#[from] KafkaProduceError),
}

/// Where the producer writes its events. A group shares one thread key and
/// is appended in order; the sink awaits the log's own delivery contract
/// and nothing more.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, key: &str, events: Vec<Event>) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    async fn emit(&self, key: &str, events: Vec<Event>) -> Result<(), SinkError> {
        self.as_ref().emit(key, events).await
    }
}

pub struct KafkaSink {
    producer: FutureProducer<KafkaContext>,
    topic: String,
}

impl KafkaSink {
    pub async fn new(
        config: KafkaConfig,
        topic: String,
        liveness: HealthHandle,
    ) -> anyhow::Result<Self> {
        let producer = create_kafka_producer(&config, liveness).await?;
        Ok(Self { producer, topic })
    }
}

#[async_trait]
impl EventSink for KafkaSink {
    async fn emit(&self, key: &str, events: Vec<Event>) -> Result<(), SinkError> {
        send_keyed_group(&self.producer, &self.topic, key, events).await?;
        Ok(())
    }
}

/// Records emissions instead of producing them. Used by tests.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("sink lock poisoned").clone()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn emit(&self, _key: &str, events: Vec<Event>) -> Result<(), SinkError> {
        self.events
            .lock()
            .expect("sink lock poisoned")
            .extend(events);
        Ok(())
    }
}
