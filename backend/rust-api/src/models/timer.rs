use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::problem::HintKind;
use crate::models::SessionState;

/// Events pushed over the per-session SSE stream. One shared 1 Hz loop
/// drives both the countdown and the disclosure statuses so the two
/// on-screen timers can never drift apart.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    TimeExpired(TimeExpired),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimerTick {
    pub session_id: String,
    pub state: SessionState,
    pub elapsed_seconds: Option<u32>,
    pub remaining_seconds: Option<u32>,
    pub hints: Vec<HintStatus>,
    pub assist: AssistStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeExpired {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl TimerEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::TimeExpired(_) => "time-expired",
        }
    }
}

/// Disclosure status of one hint at one instant. Recomputed from the
/// session anchor on every query; there is no stored "locked" flag to go
/// stale across reloads.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HintStatus {
    pub ordinal: u32,
    pub kind: HintKind,
    pub locked: bool,
    /// Absent while the session has not started (the unlock is unreachable).
    pub unlock_at: Option<DateTime<Utc>>,
    /// Countdown to the unlock; absent once unlocked or when unreachable.
    pub unlocks_in_seconds: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssistStatus {
    pub unlocked: bool,
    pub unlock_at: Option<DateTime<Utc>>,
    pub unlocks_in_seconds: Option<u32>,
}
