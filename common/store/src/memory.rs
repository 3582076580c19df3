use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use common_types::{Comment, Submission};

use crate::{EventStore, StoreError};

/// In-memory store for tests. Appends take one lock per call, giving the same
/// all-or-nothing batch visibility as the Postgres transactions, and either
/// collection's appends can be made to fail to exercise batch-retry paths.
#[derive(Default)]
pub struct MemoryStore {
    submissions: Mutex<Vec<Submission>>,
    comments: Mutex<Vec<Comment>>,
    fail_submission_appends: AtomicBool,
    fail_comment_appends: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_submission_appends(&self, fail: bool) {
        self.fail_submission_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_comment_appends(&self, fail: bool) {
        self.fail_comment_appends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append_submissions(&self, batch: &[Submission]) -> Result<(), StoreError> {
        if self.fail_submission_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("submission appends failing".into()));
        }
        self.submissions
            .lock()
            .expect("submissions lock poisoned")
            .extend_from_slice(batch);
        Ok(())
    }

    async fn append_comments(&self, batch: &[Comment]) -> Result<(), StoreError> {
        if self.fail_comment_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("comment appends failing".into()));
        }
        self.comments
            .lock()
            .expect("comments lock poisoned")
            .extend_from_slice(batch);
        Ok(())
    }

    async fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .submissions
            .lock()
            .expect("submissions lock poisoned")
            .clone())
    }

    async fn comments(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(self.comments.lock().expect("comments lock poisoned").clone())
    }
}
