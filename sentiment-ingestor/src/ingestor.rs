use std::sync::Arc;

use common_store::{EventStore, StoreError};
use common_types::{Comment, Event, Submission};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::batch::partition_events;
use crate::enrichment::SentimentClient;
use crate::metrics_consts::{
    COMMENTS_PERSISTED, ENRICHMENT_FAILURES, SUBMISSIONS_PERSISTED, TICK_BATCH_SIZE,
    TOPIC_ASSIGN_FAILURES,
};
use crate::topics::TopicAssigner;

#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("store append failed: {0}")]
    Store(#[from] StoreError),
}

/// What happened in one tick, for the tick log line and metrics.
#[derive(Debug, PartialEq, Eq)]
pub struct TickOutcome {
    pub total: usize,
    pub submissions: usize,
    pub comments: usize,
    pub enrichment_failures: usize,
}

/// One tick's pipeline: partition by kind, assign topics to submissions,
/// enrich comments under bounded parallelism, persist both partitions. The
/// caller advances the checkpoint only when this returns Ok; on Err the whole
/// batch is expected to come back on a later tick.
pub struct Ingestor {
    store: Arc<dyn EventStore>,
    enricher: Arc<dyn SentimentClient>,
    assigner: Arc<dyn TopicAssigner>,
    enrichment_concurrency: usize,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn EventStore>,
        enricher: Arc<dyn SentimentClient>,
        assigner: Arc<dyn TopicAssigner>,
        enrichment_concurrency: usize,
    ) -> Self {
        Self {
            store,
            enricher,
            assigner,
            enrichment_concurrency: enrichment_concurrency.max(1),
        }
    }

    pub async fn process_batch(&self, events: Vec<Event>) -> Result<TickOutcome, TickError> {
        let total = events.len();
        let (submissions, comments) = partition_events(events);

        // The tick log line is written for every outcome, including the
        // empty no-op tick and ticks that later fail to persist.
        info!(
            "tick: batch size {} (submissions={}, comments={})",
            total,
            submissions.len(),
            comments.len()
        );
        metrics::histogram!(TICK_BATCH_SIZE).record(total as f64);

        let submission_count = submissions.len();
        let comment_count = comments.len();

        // The two partitions are independent; run their pipelines concurrently
        let (enrichment_failures, ()) = tokio::try_join!(
            self.persist_comments(comments),
            self.persist_submissions(submissions),
        )?;

        metrics::counter!(SUBMISSIONS_PERSISTED).increment(submission_count as u64);
        metrics::counter!(COMMENTS_PERSISTED).increment(comment_count as u64);

        Ok(TickOutcome {
            total,
            submissions: submission_count,
            comments: comment_count,
            enrichment_failures,
        })
    }

    async fn persist_submissions(&self, mut submissions: Vec<Submission>) -> Result<(), TickError> {
        if submissions.is_empty() {
            return Ok(());
        }

        // Assignment degrades to the identity when the model is unreachable;
        // only the store append can fail the partition.
        if let Err(e) = self.assigner.assign(&mut submissions).await {
            metrics::counter!(TOPIC_ASSIGN_FAILURES).increment(1);
            warn!("topic assignment unavailable, keeping submissions untopiced: {}", e);
        }

        self.store.append_submissions(&submissions).await?;
        Ok(())
    }

    async fn persist_comments(&self, comments: Vec<Comment>) -> Result<usize, TickError> {
        if comments.is_empty() {
            return Ok(0);
        }

        let (comments, failures) = self.enrich_comments(comments).await;
        self.store.append_comments(&comments).await?;
        Ok(failures)
    }

    /// Runs every comment through the scoring service with a fixed-size
    /// worker pool. A failed or timed-out call leaves that comment's
    /// sentiment fields absent; the comment itself is never dropped.
    async fn enrich_comments(&self, comments: Vec<Comment>) -> (Vec<Comment>, usize) {
        let semaphore = Arc::new(Semaphore::new(self.enrichment_concurrency));
        let mut handles = Vec::with_capacity(comments.len());

        for mut comment in comments {
            let semaphore = semaphore.clone();
            let enricher = self.enricher.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("enrichment semaphore closed");
                match enricher.enrich(&comment.text).await {
                    Ok(sentiment) => {
                        comment.sentiment_score = Some(sentiment.score);
                        comment.sentiment_magnitude = Some(sentiment.magnitude);
                        (comment, false)
                    }
                    Err(e) => {
                        warn!("enrichment failed for comment {}: {}", comment.id, e);
                        metrics::counter!(ENRICHMENT_FAILURES).increment(1);
                        (comment, true)
                    }
                }
            }));
        }

        let mut enriched = Vec::with_capacity(handles.len());
        let mut failures = 0;
        for handle in handles {
            let (comment, failed) = handle.await.expect("enrichment task panicked");
            if failed {
                failures += 1;
            }
            enriched.push(comment);
        }
        (enriched, failures)
    }
}
