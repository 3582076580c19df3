use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::{ConsumerConfig, KafkaConfig};

/// A single-topic consumer for micro-batch processing. Offset *storing* is
/// manual: the service stores an offset only once the record it belongs to
/// has been durably persisted, and the stored positions are committed to the
/// broker on the configured interval. That stored/committed position is the
/// pipeline's checkpoint.
#[derive(Clone)]
pub struct BatchConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    consumer: StreamConsumer,
    topic: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DrainErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] OffsetErr),
}

#[derive(Debug, thiserror::Error)]
pub enum OffsetErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("consumer gone")]
    Gone,
}

/// One tick's worth of records: everything that was already delivered when
/// the tick fired, with the offset of each record. `skipped` counts records
/// that could not be parsed and were checkpointed past (poison pills).
pub struct DrainedBatch<T> {
    pub records: Vec<(T, Offset)>,
    pub skipped: u64,
}

impl<T> DrainedBatch<T> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl BatchConsumer {
    pub fn new(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                consumer_config.kafka_consumer_offset_reset,
            )
            .set("enable.auto.offset.store", "false")
            .set("enable.auto.commit", "true")
            .set(
                "auto.commit.interval.ms",
                consumer_config.kafka_consumer_commit_interval_ms.to_string(),
            );

        if common_config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        let inner = Inner {
            consumer,
            topic: consumer_config.kafka_consumer_topic,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Pull every record that is already waiting on the consumer, stopping as
    /// soon as the stream stays quiet for `idle` or `max_records` is reached.
    /// Records that fail to deserialize are logged, counted and checkpointed
    /// past, so one bad record never wedges the partition.
    pub async fn drain_ready<T>(
        &self,
        max_records: usize,
        idle: Duration,
    ) -> Result<DrainedBatch<T>, DrainErr>
    where
        T: DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut skipped = 0u64;

        while records.len() < max_records {
            let message = match tokio::time::timeout(idle, self.inner.consumer.recv()).await {
                Err(_) => break, // nothing more is ready, the batch is whatever we have
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(message)) => message,
            };

            let offset = Offset {
                handle: Arc::downgrade(&self.inner),
                partition: message.partition(),
                offset: message.offset(),
            };

            let Some(payload) = message.payload() else {
                offset.store()?;
                skipped += 1;
                continue;
            };

            match serde_json::from_slice(payload) {
                Ok(record) => records.push((record, offset)),
                Err(e) => {
                    warn!("skipping unparseable record: {:?}", e);
                    offset.store()?;
                    skipped += 1;
                }
            }
        }

        Ok(DrainedBatch { records, skipped })
    }

    /// Move the consumer position back to the earliest of the given offsets,
    /// per partition, so an abandoned batch is redelivered wholesale on a
    /// later tick. The stored checkpoint is untouched.
    pub fn rewind(&self, offsets: &[Offset]) -> Result<(), KafkaError> {
        let mut earliest: HashMap<i32, i64> = HashMap::new();
        for offset in offsets {
            earliest
                .entry(offset.partition)
                .and_modify(|o| *o = (*o).min(offset.offset))
                .or_insert(offset.offset);
        }

        for (partition, offset) in earliest {
            self.inner.consumer.seek(
                &self.inner.topic,
                partition,
                rdkafka::Offset::Offset(offset),
                Duration::from_secs(5),
            )?;
        }
        Ok(())
    }
}

pub struct Offset {
    handle: Weak<Inner>,
    partition: i32,
    offset: i64,
}

impl Offset {
    /// Mark this record as processed. The position only reaches the broker at
    /// the next auto-commit, so storing is cheap and done per record.
    pub fn store(self) -> Result<(), OffsetErr> {
        let inner = self.handle.upgrade().ok_or(OffsetErr::Gone)?;
        inner
            .consumer
            .store_offset(&inner.topic, self.partition, self.offset)?;
        Ok(())
    }
}
