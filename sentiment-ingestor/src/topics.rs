use std::time::Duration;

use async_trait::async_trait;
use common_types::Submission;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("topic model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("topic model returned status {0}")]
    Status(StatusCode),
    #[error("topic model returned {got} topics for {expected} submissions")]
    Mismatch { expected: usize, got: usize },
}

/// External topic-assignment model. Implementations set `topic` on each
/// submission; a submission left untouched simply has no topic yet.
#[async_trait]
pub trait TopicAssigner: Send + Sync {
    async fn assign(&self, submissions: &mut [Submission]) -> Result<(), TopicError>;
}

/// Identity assignment, used when no model endpoint is deployed.
pub struct NoopAssigner;

#[async_trait]
impl TopicAssigner for NoopAssigner {
    async fn assign(&self, _submissions: &mut [Submission]) -> Result<(), TopicError> {
        Ok(())
    }
}

#[derive(Deserialize)]
struct TopicResponse {
    topics: Vec<i32>,
}

pub struct HttpTopicAssigner {
    client: reqwest::Client,
    url: String,
}

impl HttpTopicAssigner {
    pub fn new(url: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("threadpulse-sentiment-ingestor")
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl TopicAssigner for HttpTopicAssigner {
    async fn assign(&self, submissions: &mut [Submission]) -> Result<(), TopicError> {
        let titles: Vec<&str> = submissions.iter().map(|s| s.title.as_str()).collect();
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "titles": titles }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TopicError::Status(response.status()));
        }

        let parsed: TopicResponse = response.json().await?;
        if parsed.topics.len() != submissions.len() {
            return Err(TopicError::Mismatch {
                expected: submissions.len(),
                got: parsed.topics.len(),
            });
        }

        for (submission, topic) in submissions.iter_mut().zip(parsed.topics) {
            submission.topic = Some(topic);
        }
        Ok(())
    }
}
