use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

/// What the scoring service knows about a piece of text: polarity in
/// [-1, 1] and a non-negative magnitude.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub magnitude: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    // reqwest timeouts surface here as well; a timeout is just a failure
    #[error("enrichment request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("enrichment service returned status {0}")]
    Status(StatusCode),
    #[error("enrichment returned out-of-range sentiment (score {score}, magnitude {magnitude})")]
    OutOfRange { score: f64, magnitude: f64 },
}

/// External sentiment-scoring collaborator. No retry policy here: callers
/// that want retries wrap their own around this contract.
#[async_trait]
pub trait SentimentClient: Send + Sync {
    async fn enrich(&self, text: &str) -> Result<Sentiment, EnrichmentError>;
}

pub struct HttpSentimentClient {
    client: reqwest::Client,
    url: String,
}

impl HttpSentimentClient {
    pub fn new(url: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("threadpulse-sentiment-ingestor")
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SentimentClient for HttpSentimentClient {
    async fn enrich(&self, text: &str) -> Result<Sentiment, EnrichmentError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status()));
        }

        let sentiment: Sentiment = response.json().await?;
        if !(-1.0..=1.0).contains(&sentiment.score) || sentiment.magnitude < 0.0 {
            return Err(EnrichmentError::OutOfRange {
                score: sentiment.score,
                magnitude: sentiment.magnitude,
            });
        }
        Ok(sentiment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scores_text_against_the_service() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::Json(json!({ "text": "great thread" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"score": 0.8, "magnitude": 1.2}"#)
            .create_async()
            .await;

        let client =
            HttpSentimentClient::new(server.url(), Duration::from_secs(1)).unwrap();
        let sentiment = client.enrich("great thread").await.unwrap();

        assert_eq!(sentiment.score, 0.8);
        assert_eq!(sentiment.magnitude, 1.2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn service_errors_map_to_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(503)
            .create_async()
            .await;

        let client =
            HttpSentimentClient::new(server.url(), Duration::from_secs(1)).unwrap();
        let err = client.enrich("anything").await.unwrap_err();

        assert!(matches!(
            err,
            EnrichmentError::Status(StatusCode::SERVICE_UNAVAILABLE)
        ));
    }

    #[tokio::test]
    async fn out_of_range_scores_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"score": 3.5, "magnitude": 0.1}"#)
            .create_async()
            .await;

        let client =
            HttpSentimentClient::new(server.url(), Duration::from_secs(1)).unwrap();
        let err = client.enrich("anything").await.unwrap_err();

        assert!(matches!(err, EnrichmentError::OutOfRange { .. }));
    }
}
