use std::collections::{hash_map::Entry, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Decides which reference to a submission emits its record. The ledger is
/// owned by a single producer loop; `first_reference` answers true exactly
/// once per id for the ledger's lifetime. Reference counts are kept for
/// metrics only, never for correctness.
#[async_trait]
pub trait SubmissionLedger: Send + Sync {
    async fn first_reference(&self, submission_id: &str) -> Result<bool, LedgerError>;

    /// Roll back a `first_reference` answer whose emission failed, so the
    /// next comment on the thread emits the submission instead.
    async fn retract(&self, submission_id: &str) -> Result<(), LedgerError>;
}

/// Volatile ledger: lost on restart, so a submission may be re-emitted
/// across producer lifetimes. The log is at-least-once anyway.
#[derive(Default)]
pub struct MemoryLedger {
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference_count(&self, submission_id: &str) -> u64 {
        self.counters
            .lock()
            .expect("ledger lock poisoned")
            .get(submission_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl SubmissionLedger for MemoryLedger {
    async fn first_reference(&self, submission_id: &str) -> Result<bool, LedgerError> {
        let mut counters = self.counters.lock().expect("ledger lock poisoned");
        match counters.entry(submission_id.to_string()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                Ok(false)
            }
            Entry::Vacant(entry) => {
                entry.insert(1);
                Ok(true)
            }
        }
    }

    async fn retract(&self, submission_id: &str) -> Result<(), LedgerError> {
        self.counters
            .lock()
            .expect("ledger lock poisoned")
            .remove(submission_id);
        Ok(())
    }
}

/// Durable ledger: a unique insert into the shared database decides the
/// first reference, so dedup survives producer restarts.
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionLedger for PostgresLedger {
    async fn first_reference(&self, submission_id: &str) -> Result<bool, LedgerError> {
        let ref_count: i64 = sqlx::query_scalar(
            "INSERT INTO seen_submissions (id) VALUES ($1) \
             ON CONFLICT (id) DO UPDATE SET ref_count = seen_submissions.ref_count + 1 \
             RETURNING ref_count",
        )
        .bind(submission_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ref_count == 1)
    }

    async fn retract(&self, submission_id: &str) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM seen_submissions WHERE id = $1 AND ref_count = 1")
            .bind(submission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_reference_answers_true_exactly_once() {
        let ledger = MemoryLedger::new();
        assert!(ledger.first_reference("t3_a").await.unwrap());
        assert!(!ledger.first_reference("t3_a").await.unwrap());
        assert!(!ledger.first_reference("t3_a").await.unwrap());
        assert!(ledger.first_reference("t3_b").await.unwrap());
        assert_eq!(ledger.reference_count("t3_a"), 3);
    }

    #[tokio::test]
    async fn retract_lets_the_next_reference_win() {
        let ledger = MemoryLedger::new();
        assert!(ledger.first_reference("t3_a").await.unwrap());
        ledger.retract("t3_a").await.unwrap();
        assert!(ledger.first_reference("t3_a").await.unwrap());
    }
}
