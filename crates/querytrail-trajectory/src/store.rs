//! Trajectory store trait and row shapes
//!
//! Persistence is an external collaborator: the tracker only needs an
//! interface capable of appending rows to two logical tables and reporting
//! per-row errors. Store failures are always best-effort from the tracker's
//! point of view; provenance loss must not abort a pipeline run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use querytrail_core::{SessionTrajectory, TrajectoryStep};
use serde::{Deserialize, Serialize};

/// One row in the session table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub session_id: String,
    pub original_query: String,
    pub final_response: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_steps: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

impl From<&SessionTrajectory> for SessionRow {
    fn from(trajectory: &SessionTrajectory) -> Self {
        Self {
            session_id: trajectory.session_id.clone(),
            original_query: trajectory.original_query.clone(),
            final_response: trajectory.final_response.clone(),
            start_time: trajectory.start_time,
            end_time: trajectory.end_time,
            total_steps: trajectory.total_steps,
            success: trajectory.success,
            error_message: trajectory.error_message.clone(),
        }
    }
}

/// One row in the step table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRow {
    pub step_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_type: String,
    pub tool_called: Option<String>,
    /// Tool input serialized as text
    pub tool_input: Option<String>,
    pub tool_output: Option<String>,
    pub decision_reasoning: Option<String>,
    pub sql_generated: Option<String>,
    pub table_used: Option<String>,
}

impl StepRow {
    /// Flatten a step into its persisted row shape
    pub fn from_step(session_id: &str, step: &TrajectoryStep) -> Self {
        Self {
            step_id: step.step_id.clone(),
            session_id: session_id.to_string(),
            timestamp: step.timestamp,
            agent_type: step.agent.as_str().to_string(),
            tool_called: step.tool_called.clone(),
            tool_input: step.tool_input.as_ref().map(serialize_input),
            tool_output: step.tool_output.clone(),
            decision_reasoning: step.decision_reasoning.clone(),
            sql_generated: step.sql_generated.clone(),
            table_used: step.table_used.clone(),
        }
    }
}

fn serialize_input(input: &BTreeMap<String, String>) -> String {
    // BTreeMap keys are ordered, so the serialized form is deterministic.
    serde_json::to_string(input).unwrap_or_else(|_| format!("{input:?}"))
}

/// Errors reported by a trajectory store
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only persistence for session and step rows
#[async_trait::async_trait]
pub trait TrajectoryStore: Send + Sync {
    /// Store name for log messages (e.g. "memory", "jsonl")
    fn name(&self) -> &'static str;

    /// Append one row to the session table
    async fn append_session(&self, row: &SessionRow) -> Result<(), StoreError>;

    /// Append one row to the step table
    async fn append_step(&self, row: &StepRow) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use querytrail_core::AgentKind;

    #[test]
    fn step_row_serializes_tool_input_as_text() {
        let mut input = BTreeMap::new();
        input.insert("a".to_string(), "1".to_string());
        input.insert("b".to_string(), "2".to_string());

        let step = TrajectoryStep::tool_call(
            AgentKind::DataCollection,
            "find_layers",
            input,
            "out",
            None,
        );
        let row = StepRow::from_step("s1", &step);

        assert_eq!(row.session_id, "s1");
        assert_eq!(row.agent_type, "data_collection");
        assert_eq!(row.tool_input.as_deref(), Some(r#"{"a":"1","b":"2"}"#));
    }

    #[test]
    fn decision_step_row_has_no_tool_fields() {
        let step = TrajectoryStep::decision(AgentKind::Root, "because");
        let row = StepRow::from_step("s1", &step);
        assert!(row.tool_called.is_none());
        assert!(row.tool_input.is_none());
        assert_eq!(row.decision_reasoning.as_deref(), Some("because"));
    }
}
