//! Per-conversation trajectory tracker
//!
//! A `TrajectoryTracker` records the ordered provenance of one in-flight
//! pipeline run and finalizes it into an immutable `SessionTrajectory`.
//! One tracker instance represents one logical conversation; concurrent use
//! of a single instance is a caller error, construct one per conversation
//! instead. Session state persists across stage calls by passing the same
//! instance along, never through process-wide globals.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use querytrail_core::{AgentKind, SessionTrajectory, TrajectoryStep};
use tracing::{debug, error, info, warn};

use crate::store::{SessionRow, StepRow, TrajectoryStore};

/// Tracker errors
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("no session started")]
    NoActiveSession,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    id: String,
    start_time: DateTime<Utc>,
}

/// Records the steps of one pipeline run and finalizes them
pub struct TrajectoryTracker {
    store: Arc<dyn TrajectoryStore>,
    active: Option<ActiveSession>,
    steps: Vec<TrajectoryStep>,
    original_query: Option<String>,
    /// Whether `start_session` has run since construction or the last
    /// `force_end_session`. Distinguishes "never started" (an error on
    /// `end_session`) from "already ended" (an idempotent no-op).
    started: bool,
}

impl TrajectoryTracker {
    /// Create a tracker that persists through the given store
    pub fn new(store: Arc<dyn TrajectoryStore>) -> Self {
        Self {
            store,
            active: None,
            steps: Vec::new(),
            original_query: None,
            started: false,
        }
    }

    /// Open a session, discarding any unflushed steps of a previous one.
    ///
    /// Starting over an active session is tolerated with a warning; the
    /// previous session's steps are lost.
    pub fn start_session(&mut self, session_id: impl Into<String>) -> String {
        let session_id = session_id.into();
        if let Some(active) = &self.active {
            warn!(
                new = %session_id,
                previous = %active.id,
                "starting new session while another was still active"
            );
        }
        self.active = Some(ActiveSession {
            id: session_id.clone(),
            start_time: Utc::now(),
        });
        self.steps.clear();
        self.started = true;
        info!(session = %session_id, "session started");
        session_id
    }

    /// Record the user query the session is answering
    pub fn set_original_query(&mut self, query: impl Into<String>) {
        self.original_query = Some(query.into());
    }

    /// Id of the currently open session, if any
    pub fn session_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.id.as_str())
    }

    /// Number of steps recorded since the session opened (or was last
    /// soft-ended)
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Record a tool invocation.
    ///
    /// Assumes a session is active; that is a precondition of correct use,
    /// not something this method enforces.
    pub fn log_tool_call(
        &mut self,
        agent: AgentKind,
        tool_name: impl Into<String>,
        tool_input: BTreeMap<String, String>,
        tool_output: impl Into<String>,
        reasoning: Option<String>,
    ) {
        let step = TrajectoryStep::tool_call(agent, tool_name, tool_input, tool_output, reasoning);
        debug!(agent = %agent, tool = step.tool_called.as_deref().unwrap_or(""), "logged tool call");
        self.steps.push(step);
    }

    /// Record a generated SQL query. Assumes a session is active.
    pub fn log_sql_generation(
        &mut self,
        agent: AgentKind,
        sql: impl Into<String>,
        table_used: impl Into<String>,
        reasoning: impl Into<String>,
    ) {
        let step = TrajectoryStep::sql_generation(agent, sql, table_used, reasoning);
        debug!(agent = %agent, table = step.table_used.as_deref().unwrap_or(""), "logged SQL generation");
        self.steps.push(step);
    }

    /// Record a decision and its reasoning.
    ///
    /// Defensive logging must never crash a pipeline: with no active
    /// session this warns and does nothing.
    pub fn log_decision(&mut self, agent: AgentKind, reasoning: impl Into<String>) {
        if self.active.is_none() {
            warn!(agent = %agent, "attempted to log decision without active session");
            return;
        }
        self.steps.push(TrajectoryStep::decision(agent, reasoning));
    }

    /// Close the session and return its finalized trajectory.
    ///
    /// Persistence is best-effort: store failures are logged and swallowed.
    /// With `clear_session` the tracker resets fully; without it the session
    /// id and start time are kept and only the steps are cleared, so an
    /// evaluation loop can keep accumulating under the same session.
    ///
    /// Ending an already-ended session is an idempotent no-op returning
    /// `Ok(None)`; ending when no session was ever started is an error.
    pub async fn end_session(
        &mut self,
        final_response: impl Into<String>,
        success: bool,
        error_message: Option<String>,
        clear_session: bool,
    ) -> Result<Option<SessionTrajectory>, TrajectoryError> {
        if !self.started {
            return Err(TrajectoryError::NoActiveSession);
        }
        let Some(active) = self.active.clone() else {
            info!("session already ended, skipping duplicate end_session call");
            return Ok(None);
        };

        let trajectory = SessionTrajectory {
            session_id: active.id.clone(),
            original_query: self
                .original_query
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            final_response: final_response.into(),
            steps: self.steps.clone(),
            start_time: active.start_time,
            end_time: Utc::now(),
            total_steps: self.steps.len(),
            success,
            error_message,
        };

        self.persist(&trajectory).await;

        info!(
            session = %active.id,
            steps = trajectory.total_steps,
            "session ended"
        );

        if clear_session {
            self.active = None;
            self.original_query = None;
        }
        self.steps.clear();

        Ok(Some(trajectory))
    }

    /// Unconditionally reset to idle, discarding unflushed steps without
    /// persisting anything. Guarantees a clean slate between unrelated runs.
    pub fn force_end_session(&mut self) {
        match &self.active {
            Some(active) => info!(session = %active.id, "force ending session"),
            None => debug!("no active session to force end"),
        }
        self.active = None;
        self.steps.clear();
        self.original_query = None;
        self.started = false;
    }

    async fn persist(&self, trajectory: &SessionTrajectory) {
        let session_row = SessionRow::from(trajectory);
        if let Err(e) = self.store.append_session(&session_row).await {
            error!(store = self.store.name(), %e, "failed to persist session row");
        }
        for step in &trajectory.steps {
            let row = StepRow::from_step(&trajectory.session_id, step);
            if let Err(e) = self.store.append_step(&row).await {
                error!(store = self.store.name(), step = %row.step_id, %e, "failed to persist step row");
            }
        }
    }
}
