use async_trait::async_trait;
use common_types::{Comment, Submission};
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("append rejected: {0}")]
    Rejected(String),
}

/// The persisted collections behind the pipeline: append-only submissions and
/// comments. Appends are atomic per call — a batch partition becomes visible
/// to readers all at once or not at all. Duplicate appends are tolerated;
/// batch-level retries may replay records.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append_submissions(&self, batch: &[Submission]) -> Result<(), StoreError>;
    async fn append_comments(&self, batch: &[Comment]) -> Result<(), StoreError>;
    async fn submissions(&self) -> Result<Vec<Submission>, StoreError>;
    async fn comments(&self) -> Result<Vec<Comment>, StoreError>;
}
