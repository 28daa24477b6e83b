//! In-memory trajectory store
//!
//! Stores rows in memory behind an `Arc<RwLock>`. Useful for unit tests,
//! demos without disk access, and simulating write failures.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::store::{SessionRow, StepRow, StoreError, TrajectoryStore};

/// In-memory trajectory store
///
/// Clones share the same underlying tables, so a test can keep a handle and
/// inspect what the tracker persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<Vec<SessionRow>>>,
    steps: Arc<RwLock<Vec<StepRow>>>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every write to fail, for exercising the tracker's
    /// best-effort persistence path
    pub fn with_write_failures(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Snapshot of all persisted session rows
    pub async fn sessions(&self) -> Vec<SessionRow> {
        self.sessions.read().await.clone()
    }

    /// Snapshot of all persisted step rows
    pub async fn steps(&self) -> Vec<StepRow> {
        self.steps.read().await.clone()
    }

    /// Number of persisted session rows
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of persisted step rows
    pub async fn step_count(&self) -> usize {
        self.steps.read().await.len()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            steps: Arc::clone(&self.steps),
            fail_writes: self.fail_writes,
        }
    }
}

#[async_trait::async_trait]
impl TrajectoryStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn append_session(&self, row: &SessionRow) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteFailed("simulated failure".to_string()));
        }
        self.sessions.write().await.push(row.clone());
        Ok(())
    }

    async fn append_step(&self, row: &StepRow) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteFailed("simulated failure".to_string()));
        }
        self.steps.write().await.push(row.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn session_row(id: &str) -> SessionRow {
        SessionRow {
            session_id: id.to_string(),
            original_query: "q".to_string(),
            final_response: "r".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            total_steps: 0,
            success: true,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn appends_are_visible_through_clones() {
        let store = MemoryStore::new();
        let handle = store.clone();

        store.append_session(&session_row("s1")).await.unwrap();

        assert_eq!(handle.session_count().await, 1);
        assert_eq!(handle.sessions().await[0].session_id, "s1");
    }

    #[tokio::test]
    async fn write_failures_are_reported_per_row() {
        let store = MemoryStore::new().with_write_failures();
        let result = store.append_session(&session_row("s1")).await;
        assert!(matches!(result, Err(StoreError::WriteFailed(_))));
        assert_eq!(store.session_count().await, 0);
    }
}
