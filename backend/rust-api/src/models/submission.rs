use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SessionMode;

/// The one durable side effect of a finished session, shipped to the
/// grading collaborator by exactly one accepted finalize call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub session_id: String,
    pub user_id: String,
    pub problem_id: String,
    pub mode: SessionMode,
    pub passed: bool,
    pub duration_seconds: u32,
    pub language: Option<String>,
    /// True when the session was closed by deadline expiry rather than an
    /// explicit learner submission.
    pub forced: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Grading collaborator's answer to a finalize call.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeResponse {
    pub accepted: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Where a finished session stands with respect to its finalize call.
/// A failed finalize leaves the session finished (never back to active)
/// and permits an explicit retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalizeState {
    Pending,
    Accepted,
    Rejected { reason: Option<String> },
    Failed { reason: String },
}

impl FinalizeState {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FinalizeState::Failed { .. })
    }
}
