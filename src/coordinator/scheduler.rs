//! Single cancellable deadline for the return-to-sunset callback.

use chrono::{DateTime, Utc};
use std::time::Duration as StdDuration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduler {
    deadline: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Arm the timer for `at`, replacing any earlier deadline.
    /// Returns `false` if the same deadline was already armed.
    pub fn schedule_at(&mut self, at: DateTime<Utc>) -> bool {
        if self.deadline == Some(at) {
            return false;
        }
        self.deadline = Some(at);
        true
    }

    /// Returns `true` if a deadline was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Fire the deadline if it has passed. A fired deadline is disarmed.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left until the deadline, zero when overdue.
    pub fn time_until(&self, now: DateTime<Utc>) -> Option<StdDuration> {
        self.deadline
            .map(|deadline| (deadline - now).to_std().unwrap_or(StdDuration::ZERO))
    }
}
