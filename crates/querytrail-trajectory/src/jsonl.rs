//! Append-only JSONL trajectory store
//!
//! Writes one JSON object per line to two files in a target directory:
//! `session_trajectories.jsonl` and `trajectory_steps.jsonl`, mirroring the
//! two logical tables of the store contract.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::store::{SessionRow, StepRow, StoreError, TrajectoryStore};

const SESSIONS_FILE: &str = "session_trajectories.jsonl";
const STEPS_FILE: &str = "trajectory_steps.jsonl";

/// File-backed trajectory store
#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { dir })
    }

    /// Path of the session table file
    pub fn sessions_path(&self) -> PathBuf {
        self.dir.join(SESSIONS_FILE)
    }

    /// Path of the step table file
    pub fn steps_path(&self) -> PathBuf {
        self.dir.join(STEPS_FILE)
    }

    async fn append_line<T: serde::Serialize>(path: &Path, row: &T) -> Result<(), StoreError> {
        let mut line =
            serde_json::to_string(row).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TrajectoryStore for JsonlStore {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn append_session(&self, row: &SessionRow) -> Result<(), StoreError> {
        Self::append_line(&self.sessions_path(), row).await
    }

    async fn append_step(&self, row: &StepRow) -> Result<(), StoreError> {
        Self::append_line(&self.steps_path(), row).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn appends_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("runs")).await.unwrap();

        for id in ["s1", "s2"] {
            let row = SessionRow {
                session_id: id.to_string(),
                original_query: "q".to_string(),
                final_response: "r".to_string(),
                start_time: Utc::now(),
                end_time: Utc::now(),
                total_steps: 0,
                success: true,
                error_message: None,
            };
            store.append_session(&row).await.unwrap();
        }

        let contents = std::fs::read_to_string(store.sessions_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: SessionRow = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.session_id, "s1");
    }

    #[tokio::test]
    async fn step_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path()).await.unwrap();

        let row = StepRow {
            step_id: "step-1".to_string(),
            session_id: "s1".to_string(),
            timestamp: Utc::now(),
            agent_type: "data_collection".to_string(),
            tool_called: Some("find_layers".to_string()),
            tool_input: Some(r#"{"a":"users"}"#.to_string()),
            tool_output: Some("[]".to_string()),
            decision_reasoning: None,
            sql_generated: None,
            table_used: None,
        };
        store.append_step(&row).await.unwrap();

        let contents = std::fs::read_to_string(store.steps_path()).unwrap();
        let back: StepRow = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(back, row);
    }
}
