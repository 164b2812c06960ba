use chrono::{DateTime, Duration, Utc};

use crate::models::problem::Hint;
use crate::models::timer::{AssistStatus, HintStatus};

/// Computes which time-gated resources (hints, AI assistance) are unlocked
/// at a given instant, purely from the session anchor.
///
/// Nothing is stored: re-opening a session after a reload reproduces
/// identical unlock status as long as the caller preserves the anchor.
/// While the session has not started, every resource is locked with no
/// reachable unlock time.
#[derive(Debug, Clone)]
pub struct DisclosureScheduler {
    unlock_interval: Duration,
    assist_delay: Duration,
}

impl DisclosureScheduler {
    pub fn new(unlock_interval_seconds: u32, assist_delay_seconds: u32) -> Self {
        Self {
            unlock_interval: Duration::seconds(i64::from(unlock_interval_seconds)),
            assist_delay: Duration::seconds(i64::from(assist_delay_seconds)),
        }
    }

    /// `anchor + (ordinal + 1) * unlock_interval`: the first hint opens one
    /// interval after start, not immediately.
    pub fn hint_unlock_at(&self, anchor: DateTime<Utc>, ordinal: u32) -> DateTime<Utc> {
        anchor + self.unlock_interval * (ordinal as i32 + 1)
    }

    pub fn hint_status(
        &self,
        hint: &Hint,
        anchor: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> HintStatus {
        let Some(anchor) = anchor else {
            return HintStatus {
                ordinal: hint.ordinal,
                kind: hint.kind,
                locked: true,
                unlock_at: None,
                unlocks_in_seconds: None,
            };
        };

        let unlock_at = self.hint_unlock_at(anchor, hint.ordinal);
        let locked = now < unlock_at;
        HintStatus {
            ordinal: hint.ordinal,
            kind: hint.kind,
            locked,
            unlock_at: Some(unlock_at),
            unlocks_in_seconds: locked.then(|| (unlock_at - now).num_seconds().max(0) as u32),
        }
    }

    pub fn hint_statuses(
        &self,
        hints: &[Hint],
        anchor: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<HintStatus> {
        hints
            .iter()
            .map(|hint| self.hint_status(hint, anchor, now))
            .collect()
    }

    /// The AI-assist gate opens `assist_delay` after the anchor. A UX/policy
    /// control, not a security boundary.
    pub fn assist_status(&self, anchor: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AssistStatus {
        let Some(anchor) = anchor else {
            return AssistStatus {
                unlocked: false,
                unlock_at: None,
                unlocks_in_seconds: None,
            };
        };

        let unlock_at = anchor + self.assist_delay;
        let unlocked = now >= unlock_at;
        AssistStatus {
            unlocked,
            unlock_at: Some(unlock_at),
            unlocks_in_seconds: (!unlocked).then(|| (unlock_at - now).num_seconds().max(0) as u32),
        }
    }
}
