use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::problem::ProblemView;
use crate::models::submission::FinalizeState;
use crate::models::timer::{AssistStatus, HintStatus};

pub mod execution;
pub mod problem;
pub mod submission;
pub mod timer;

/// One attempt at one problem in one mode.
///
/// `anchor_time` is stamped exactly once, when the session first becomes
/// active. Every disclosure and deadline computation derives from it, so a
/// client that reconnects mid-attempt sees identical countdowns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub problem_id: String,
    pub mode: SessionMode,
    pub state: SessionState,
    pub anchor_time: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub time_limit_seconds: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Practice,
    Assignment,
    Test,
    Contest,
}

impl SessionMode {
    /// Test and contest attempts run against a hard deadline; practice and
    /// assignment attempts only track elapsed time.
    pub fn has_deadline(&self) -> bool {
        matches!(self, SessionMode::Test | SessionMode::Contest)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Practice => "practice",
            SessionMode::Assignment => "assignment",
            SessionMode::Test => "test",
            SessionMode::Contest => "contest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Active,
    Finished,
}

impl SessionState {
    /// Transitions are monotonic: NotStarted -> Active -> Finished.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::NotStarted, SessionState::Active)
                | (SessionState::Active, SessionState::Finished)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::Active => "active",
            SessionState::Finished => "finished",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub problem_id: String,
    pub mode: SessionMode,
    /// Overrides the problem's own time limit for deadline-bearing modes.
    #[validate(range(min = 1, max = 86400))]
    pub time_limit_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub mode: SessionMode,
    pub state: SessionState,
    pub problem: ProblemView,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub user_id: String,
    pub problem_id: String,
    pub mode: SessionMode,
    pub state: SessionState,
    pub anchor_time: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<u32>,
    pub remaining_seconds: Option<u32>,
    pub focus_mode_engaged: bool,
    pub finalize: Option<FinalizeState>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RunRequest {
    #[validate(length(min = 1, max = 32))]
    pub language: String,
    #[validate(length(max = 262144))]
    pub source: String,
    #[serde(default)]
    pub stdin: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RunTestsRequest {
    #[validate(length(min = 1, max = 32))]
    pub language: String,
    #[validate(length(max = 262144))]
    pub source: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FinishSessionRequest {
    /// Explicit pass/fail override; when absent the session's last recorded
    /// harness outcome is used (failing if the learner never ran the tests).
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FinishSessionResponse {
    pub session_id: String,
    pub state: SessionState,
    pub forced: bool,
    pub passed: bool,
    pub duration_seconds: u32,
    pub finalize: FinalizeState,
}

#[derive(Debug, Serialize)]
pub struct HintListResponse {
    pub session_id: String,
    pub hints: Vec<HintView>,
    pub assist: AssistStatus,
}

/// A hint's disclosure status plus its content once unlocked. Locked hints
/// never carry content over the wire.
#[derive(Debug, Serialize)]
pub struct HintView {
    #[serde(flatten)]
    pub status: HintStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssistRequest {
    pub mode: AssistMode,
    #[validate(length(max = 262144))]
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistMode {
    Guide,
    Solution,
}

impl AssistMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistMode::Guide => "guide",
            AssistMode::Solution => "solution",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssistResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_are_monotonic() {
        assert!(SessionState::NotStarted.can_transition_to(SessionState::Active));
        assert!(SessionState::Active.can_transition_to(SessionState::Finished));

        assert!(!SessionState::Finished.can_transition_to(SessionState::Active));
        assert!(!SessionState::Finished.can_transition_to(SessionState::NotStarted));
        assert!(!SessionState::Active.can_transition_to(SessionState::NotStarted));
        assert!(!SessionState::NotStarted.can_transition_to(SessionState::Finished));
    }

    #[test]
    fn only_test_and_contest_carry_deadlines() {
        assert!(!SessionMode::Practice.has_deadline());
        assert!(!SessionMode::Assignment.has_deadline());
        assert!(SessionMode::Test.has_deadline());
        assert!(SessionMode::Contest.has_deadline());
    }
}
