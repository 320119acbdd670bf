//! Trailing-edge debouncing for recomputation requests.
//!
//! Each trigger pushes the deadline out by the configured interval; the work
//! runs once the caller polls after the deadline has passed. Time is passed in
//! explicitly so callers (and tests) control the clock.

use std::time::{Duration, Instant};

use log::debug;

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
    coalesced: usize,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            coalesced: 0,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        if self.deadline.is_some() {
            self.coalesced += 1;
        }
        self.deadline = Some(now + self.interval);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per burst of triggers, after the quiet
    /// interval has elapsed.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                if self.coalesced > 0 {
                    debug!("Coalesced {} refresh request(s)", self.coalesced);
                }
                self.deadline = None;
                self.coalesced = 0;
                true
            }
            _ => false,
        }
    }
}
