//! Self-rescheduling deferred task for progress polling.
//!
//! The ticker never runs anything itself. The owning session asks it on every
//! poll whether the task is due, runs it, and re-arms it from inside the task
//! when the task should keep going.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Idle,
    Asap,
    At(Instant),
}

#[derive(Debug, Clone)]
pub struct ProgressTicker {
    interval: Duration,
    pending: Pending,
}

impl ProgressTicker {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Pending::Idle,
        }
    }

    /// Run on the next poll, replacing any pending run.
    pub fn post(&mut self) {
        self.pending = Pending::Asap;
    }

    /// Run one interval after `now`.
    pub fn post_delayed(&mut self, now: Instant) {
        self.pending = Pending::At(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.pending = Pending::Idle;
    }

    pub fn is_armed(&self) -> bool {
        self.pending != Pending::Idle
    }

    /// Disarm and return true if a run is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        let due = match self.pending {
            Pending::Idle => false,
            Pending::Asap => true,
            Pending::At(at) => at <= now,
        };
        if due {
            self.pending = Pending::Idle;
        }
        due
    }
}
