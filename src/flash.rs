// SPDX-License-Identifier: GPL-3.0-only

//! Screen flash shown at the moment of capture
//!
//! The flash is a white overlay that is visible for a fixed pulse and then
//! clears itself. Callers never turn it off; they only ask whether it is
//! still visible at a given instant.

use crate::constants::timing;
use std::time::{Duration, Instant};
use tracing::debug;

/// A self-clearing visual pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashPulse {
    duration: Duration,
    fired_at: Option<Instant>,
}

impl FlashPulse {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fired_at: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Show the flash starting at `now`; re-triggering restarts the pulse
    pub fn trigger(&mut self, now: Instant) {
        debug!(duration_ms = self.duration.as_millis() as u64, "Flash");
        self.fired_at = Some(now);
    }

    /// Whether the overlay is visible at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        self.fired_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.duration)
    }

    /// Drop an expired pulse; returns true if it just cleared
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.fired_at.is_some() && !self.is_active(now) {
            self.fired_at = None;
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.fired_at = None;
    }
}

impl Default for FlashPulse {
    fn default() -> Self {
        Self::new(timing::FLASH_DURATION)
    }
}
