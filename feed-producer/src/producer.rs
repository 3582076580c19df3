use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common_types::{Comment, Event, Submission};
use health::HealthHandle;
use tracing::{info, warn};

use crate::dedup::{LedgerError, SubmissionLedger};
use crate::feed::{CommentFeed, RawComment};
use crate::metrics_consts::{
    EVENTS_EMITTED, FEED_POLL_ERRORS, RECORDS_SKIPPED, SUBMISSIONS_DEDUPED,
};
use crate::sink::{EventSink, SinkError};

#[derive(Debug, thiserror::Error)]
pub enum ProduceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// The dedup gate: a sequential loop over the comment feed that emits every
/// comment and, for the first comment seen on a thread, the thread's
/// submission first. The ledger is accessed by this loop alone.
pub struct FeedProducer<F, S> {
    feed: F,
    ledger: Arc<dyn SubmissionLedger>,
    sink: S,
    liveness: HealthHandle,
    poll_interval: Duration,
}

impl<F, S> FeedProducer<F, S>
where
    F: CommentFeed,
    S: EventSink,
{
    pub fn new(
        feed: F,
        ledger: Arc<dyn SubmissionLedger>,
        sink: S,
        liveness: HealthHandle,
        poll_interval: Duration,
    ) -> Self {
        Self {
            feed,
            ledger,
            sink,
            liveness,
            poll_interval,
        }
    }

    /// Emits 0 or 1 submission plus exactly 1 comment for one raw comment.
    /// The submission, when emitted, precedes the comment in the same keyed
    /// group, so the log orders it before the comment.
    pub async fn process_comment(&self, raw: RawComment) -> Result<(), ProduceError> {
        let comment = Comment {
            id: raw.id,
            submission_id: raw.submission.id.clone(),
            author: raw.author,
            text: raw.text,
            created_at: raw.created_at,
            sentiment_score: None,
            sentiment_magnitude: None,
        };
        let thread_id = comment.submission_id.clone();

        let first = self.ledger.first_reference(&thread_id).await?;
        let mut events = Vec::with_capacity(2);
        if first {
            events.push(Event::Submission(Submission {
                id: raw.submission.id,
                title: raw.submission.title,
                created_at: raw.submission.created_at,
                topic: None,
            }));
        } else {
            metrics::counter!(SUBMISSIONS_DEDUPED).increment(1);
        }
        events.push(Event::Comment(comment));

        let emitted = events.len() as u64;
        if let Err(e) = self.sink.emit(&thread_id, events).await {
            if first {
                // The submission never reached the log; hand the emission to
                // the next comment on the thread.
                if let Err(retract_err) = self.ledger.retract(&thread_id).await {
                    warn!(
                        "failed to retract ledger entry for {}: {}",
                        thread_id, retract_err
                    );
                }
            }
            return Err(e.into());
        }

        metrics::counter!(EVENTS_EMITTED).increment(emitted);
        Ok(())
    }

    /// Runs until shutdown. A record that fails to derive or emit is logged
    /// and skipped; the stream never halts for one bad record.
    pub async fn run(mut self, shutdown: impl Future<Output = ()> + Send) {
        tokio::pin!(shutdown);
        info!("feed producer started");

        loop {
            self.liveness.report_healthy().await;

            let page = tokio::select! {
                _ = &mut shutdown => break,
                page = self.feed.poll() => page,
            };

            match page {
                Ok(comments) if comments.is_empty() => {
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Ok(comments) => {
                    for raw in comments {
                        let comment_id = raw.id.clone();
                        if let Err(e) = self.process_comment(raw).await {
                            metrics::counter!(RECORDS_SKIPPED).increment(1);
                            warn!("skipping comment {}: {}", comment_id, e);
                        }
                    }
                }
                Err(e) => {
                    metrics::counter!(FEED_POLL_ERRORS).increment(1);
                    warn!("feed poll failed: {}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }

        info!("feed producer stopped");
    }
}
