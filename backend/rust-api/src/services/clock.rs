use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

/// Wall-clock-anchored attempt timer.
///
/// Every query is a pure function of `now` against the absolute
/// anchor/deadline pair, never an accumulated tick count, so a throttled or
/// reconnecting client cannot drift the countdown. The expiry latch
/// guarantees the expiry signal is observed at most once per session even
/// when the tick loop is re-entered or several streams watch the same
/// attempt.
#[derive(Debug)]
pub struct Clock {
    anchor: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    expiry_fired: AtomicBool,
}

impl Clock {
    pub fn new(anchor: DateTime<Utc>, deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            anchor,
            deadline,
            expiry_fired: AtomicBool::new(false),
        }
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Whole seconds since the anchor, clamped at zero against skew.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u32 {
        (now - self.anchor).num_seconds().max(0) as u32
    }

    /// Whole seconds until the deadline, clamped at zero. None when the
    /// session has no deadline.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u32> {
        self.deadline
            .map(|deadline| (deadline - now).num_seconds().max(0) as u32)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Returns true exactly once, at the first call observing an expired
    /// deadline. Subsequent calls (or concurrent callers) get false.
    pub fn expire_once(&self, now: DateTime<Utc>) -> bool {
        if !self.is_expired(now) {
            return false;
        }
        self.expiry_fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
