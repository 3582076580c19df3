use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_types::{Comment, Submission};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{EventStore, StoreError};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool, for collaborators that share the database (the
    /// producer's submission ledger lives next to the collections).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    topic: Option<i32>,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            topic: row.topic,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    submission_id: String,
    author: String,
    text: String,
    created_at: DateTime<Utc>,
    sentiment_score: Option<f64>,
    sentiment_magnitude: Option<f64>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            submission_id: row.submission_id,
            author: row.author,
            text: row.text,
            created_at: row.created_at,
            sentiment_score: row.sentiment_score,
            sentiment_magnitude: row.sentiment_magnitude,
        }
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn append_submissions(&self, batch: &[Submission]) -> Result<(), StoreError> {
        // One transaction per batch partition: readers see all of it or none
        let mut tx = self.pool.begin().await?;
        for submission in batch {
            sqlx::query(
                "INSERT INTO submissions (id, title, created_at, topic) VALUES ($1, $2, $3, $4)",
            )
            .bind(&submission.id)
            .bind(&submission.title)
            .bind(submission.created_at)
            .bind(submission.topic)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append_comments(&self, batch: &[Comment]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for comment in batch {
            sqlx::query(
                "INSERT INTO comments (id, submission_id, author, text, created_at, sentiment_score, sentiment_magnitude) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&comment.id)
            .bind(&comment.submission_id)
            .bind(&comment.author)
            .bind(&comment.text)
            .bind(comment.created_at)
            .bind(comment.sentiment_score)
            .bind(comment.sentiment_magnitude)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT id, title, created_at, topic FROM submissions",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn comments(&self) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, submission_id, author, text, created_at, sentiment_score, sentiment_magnitude \
             FROM comments",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
