use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion thread's root record. `topic` is only present once the
/// topic-assignment model has run over it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<i32>,
}

/// A comment under a submission. Sentiment fields are only present once
/// enrichment has succeeded; they stay absent if it fails.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub submission_id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_magnitude: Option<f64>,
}

impl Comment {
    pub fn is_enriched(&self) -> bool {
        self.sentiment_score.is_some()
    }
}

// The wire format on the event log: a tagged union, so two structurally
// different record kinds can flow through one topic.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Submission(Submission),
    Comment(Comment),
}

impl Event {
    /// Partition key: all records of one discussion thread share it, so the
    /// log preserves their relative order.
    pub fn thread_id(&self) -> &str {
        match self {
            Event::Submission(submission) => &submission.id,
            Event::Comment(comment) => &comment.submission_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Submission(_) => "submission",
            Event::Comment(_) => "comment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_submission() {
        let event: Event = serde_json::from_value(json!({
            "type": "submission",
            "id": "t3_abc",
            "title": "breaking news",
            "created_at": "2020-01-01T00:00:00Z"
        }))
        .unwrap();

        let Event::Submission(submission) = event else {
            panic!("expected submission variant");
        };
        assert_eq!(submission.id, "t3_abc");
        assert_eq!(submission.topic, None);
    }

    #[test]
    fn parses_tagged_comment_without_sentiment() {
        let event: Event = serde_json::from_value(json!({
            "type": "comment",
            "id": "c1",
            "submission_id": "t3_abc",
            "author": "someone",
            "text": "first",
            "created_at": "2020-01-01T00:00:10Z"
        }))
        .unwrap();

        let Event::Comment(comment) = event else {
            panic!("expected comment variant");
        };
        assert!(!comment.is_enriched());
        assert_eq!(event_key(&comment), "t3_abc");
    }

    fn event_key(comment: &Comment) -> String {
        Event::Comment(comment.clone()).thread_id().to_string()
    }

    #[test]
    fn sentiment_fields_are_omitted_until_set() {
        let mut comment = Comment {
            id: "c1".to_string(),
            submission_id: "t3_abc".to_string(),
            author: "someone".to_string(),
            text: "first".to_string(),
            created_at: Utc::now(),
            sentiment_score: None,
            sentiment_magnitude: None,
        };

        let serialized = serde_json::to_value(Event::Comment(comment.clone())).unwrap();
        assert!(serialized.get("sentiment_score").is_none());

        comment.sentiment_score = Some(0.4);
        comment.sentiment_magnitude = Some(0.9);
        let serialized = serde_json::to_value(Event::Comment(comment)).unwrap();
        assert_eq!(serialized["sentiment_score"], json!(0.4));
        assert_eq!(serialized["type"], json!("comment"));
    }
}
