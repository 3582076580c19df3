use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common_store::{EventStore, MemoryStore};
use common_types::{Comment, Event, Submission};
use sentiment_ingestor::enrichment::{EnrichmentError, Sentiment, SentimentClient};
use sentiment_ingestor::ingestor::Ingestor;
use sentiment_ingestor::topics::NoopAssigner;

struct ScriptedEnricher {
    scores: HashMap<String, f64>,
}

#[async_trait]
impl SentimentClient for ScriptedEnricher {
    async fn enrich(&self, text: &str) -> Result<Sentiment, EnrichmentError> {
        match self.scores.get(text) {
            Some(score) => Ok(Sentiment {
                score: *score,
                magnitude: score.abs(),
            }),
            None => Err(EnrichmentError::Status(
                axum::http::StatusCode::BAD_GATEWAY,
            )),
        }
    }
}

fn batch() -> Vec<Event> {
    vec![
        Event::Submission(Submission {
            id: "s1".to_string(),
            title: "a thread".to_string(),
            created_at: Utc::now(),
            topic: None,
        }),
        Event::Comment(Comment {
            id: "c1".to_string(),
            submission_id: "s1".to_string(),
            author: "someone".to_string(),
            text: "nice".to_string(),
            created_at: Utc::now(),
            sentiment_score: None,
            sentiment_magnitude: None,
        }),
    ]
}

fn ingestor(store: Arc<MemoryStore>) -> Ingestor {
    let scores = HashMap::from([("nice".to_string(), 0.7)]);
    Ingestor::new(
        store,
        Arc::new(ScriptedEnricher { scores }),
        Arc::new(NoopAssigner),
        2,
    )
}

// A batch whose comment append fails is abandoned wholesale and comes back on
// a later tick. The submission partition already committed, so the retry
// appends it a second time: duplicate appends are the documented cost of
// all-or-nothing batch retry.
#[tokio::test]
async fn abandoned_batch_is_retried_wholesale_and_may_duplicate() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = ingestor(store.clone());

    store.fail_comment_appends(true);
    assert!(ingestor.process_batch(batch()).await.is_err());
    assert!(store.comments().await.unwrap().is_empty());
    let submissions_after_failure = store.submissions().await.unwrap().len();

    // redelivery on a later tick
    store.fail_comment_appends(false);
    let outcome = ingestor.process_batch(batch()).await.unwrap();
    assert_eq!(outcome.comments, 1);

    let comments = store.comments().await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].sentiment_score, Some(0.7));

    let submissions = store.submissions().await.unwrap();
    assert_eq!(
        submissions.len(),
        submissions_after_failure + 1,
        "retried batch re-appends the partition that had already committed"
    );
}

#[tokio::test]
async fn successive_ticks_accumulate_in_the_store() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = ingestor(store.clone());

    ingestor.process_batch(batch()).await.unwrap();
    ingestor.process_batch(vec![]).await.unwrap(); // quiet tick
    ingestor.process_batch(batch()).await.unwrap();

    assert_eq!(store.submissions().await.unwrap().len(), 2);
    assert_eq!(store.comments().await.unwrap().len(), 2);
}
