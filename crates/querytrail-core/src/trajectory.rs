//! Trajectory records
//!
//! A trajectory is the ordered provenance of one pipeline run: every tool
//! invocation, decision, and generated query, finalized into an immutable
//! `SessionTrajectory` when the session ends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which pipeline stage (or sub-agent) produced a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// The outer caller driving the pipeline
    Root,

    /// Stage 1: intent classification
    Intent,

    /// Stage 2: data collection (lineage, metadata, search tools)
    DataCollection,

    /// Stage 3: answer synthesis
    Synthesis,
}

impl AgentKind {
    /// Stable string identifier, used in persisted step rows
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Intent => "intent",
            Self::DataCollection => "data_collection",
            Self::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded event in a session trajectory
///
/// A step is an append-only fact: it is created fully formed and never
/// mutated afterwards. At least one of `tool_called`, `decision_reasoning`,
/// or `sql_generated` is set by the constructors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// Unique step identifier (UUID v4)
    pub step_id: String,

    /// When the step was recorded (UTC)
    pub timestamp: DateTime<Utc>,

    /// Which stage produced the step
    pub agent: AgentKind,

    /// Tool name, for tool-invocation steps
    pub tool_called: Option<String>,

    /// Tool input parameters
    pub tool_input: Option<BTreeMap<String, String>>,

    /// Tool output text
    pub tool_output: Option<String>,

    /// Free-form reasoning behind a decision
    pub decision_reasoning: Option<String>,

    /// Generated SQL, for query-generation steps
    pub sql_generated: Option<String>,

    /// Table targeted by the generated SQL
    pub table_used: Option<String>,
}

impl TrajectoryStep {
    /// Record a tool invocation
    pub fn tool_call(
        agent: AgentKind,
        tool_name: impl Into<String>,
        tool_input: BTreeMap<String, String>,
        tool_output: impl Into<String>,
        reasoning: Option<String>,
    ) -> Self {
        Self {
            step_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            agent,
            tool_called: Some(tool_name.into()),
            tool_input: Some(tool_input),
            tool_output: Some(tool_output.into()),
            decision_reasoning: reasoning,
            sql_generated: None,
            table_used: None,
        }
    }

    /// Record a decision with its reasoning
    pub fn decision(agent: AgentKind, reasoning: impl Into<String>) -> Self {
        Self {
            step_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            agent,
            tool_called: None,
            tool_input: None,
            tool_output: None,
            decision_reasoning: Some(reasoning.into()),
            sql_generated: None,
            table_used: None,
        }
    }

    /// Record a generated SQL query and the decision behind it
    pub fn sql_generation(
        agent: AgentKind,
        sql: impl Into<String>,
        table_used: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            step_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            agent,
            tool_called: None,
            tool_input: None,
            tool_output: None,
            decision_reasoning: Some(reasoning.into()),
            sql_generated: Some(sql.into()),
            table_used: Some(table_used.into()),
        }
    }
}

/// Finalized record of one pipeline run
///
/// Created exactly once per session at end-of-session time; immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrajectory {
    /// Session identifier
    pub session_id: String,

    /// The user query that started the run
    pub original_query: String,

    /// Final answer produced by the run
    pub final_response: String,

    /// Ordered steps recorded during the run
    pub steps: Vec<TrajectoryStep>,

    /// Session start time (UTC)
    pub start_time: DateTime<Utc>,

    /// Session end time (UTC)
    pub end_time: DateTime<Utc>,

    /// Number of recorded steps
    pub total_steps: usize,

    /// Whether the run completed successfully
    pub success: bool,

    /// Error description for failed runs
    pub error_message: Option<String>,
}
