use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Deserialize;

/// The submission a raw comment belongs to, as snapshotted by the feed at
/// the time the comment was observed.
#[derive(Clone, Debug, Deserialize)]
pub struct SubmissionSnapshot {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawComment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub submission: SubmissionSnapshot,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("feed returned status {0}")]
    Status(StatusCode),
}

/// The upstream comment stream. One poll returns every comment observed
/// since the previous poll, oldest first; an empty page means nothing new.
#[async_trait]
pub trait CommentFeed: Send {
    async fn poll(&mut self) -> Result<Vec<RawComment>, FeedError>;
}

#[derive(Deserialize)]
struct FeedPage {
    comments: Vec<RawComment>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Polls the feed service over HTTP with a resume cursor.
pub struct HttpCommentFeed {
    client: reqwest::Client,
    endpoint: String,
    channel: String,
    cursor: Option<String>,
}

impl HttpCommentFeed {
    pub fn new(endpoint: String, channel: String) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("threadpulse-feed-producer")
            .build()?;
        Ok(Self {
            client,
            endpoint,
            channel,
            cursor: None,
        })
    }
}

#[async_trait]
impl CommentFeed for HttpCommentFeed {
    async fn poll(&mut self) -> Result<Vec<RawComment>, FeedError> {
        let url = format!("{}/channels/{}/comments", self.endpoint, self.channel);
        let mut request = self.client.get(&url);
        if let Some(cursor) = &self.cursor {
            request = request.query(&[("after", cursor.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        let page: FeedPage = response.json().await?;
        if page.cursor.is_some() {
            self.cursor = page.cursor;
        }
        Ok(page.comments)
    }
}
