//! Acquisition options for the table lock.
//!
//! The defaults are part of the on-disk protocol shared with other programs
//! that lock the same files, so they should only be changed for tests and
//! diagnostics.

use crate::error::{LockError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Maximum seconds between the first and the last acquisition attempt.
pub const MAX_WAIT_SECS: u64 = 30;

/// Sleep between attempts, in microseconds.
pub const POLL_INTERVAL_MICROS: u64 = 5000;

/// Upper bound for the poll interval (it must stay below one second).
pub const MAX_POLL_INTERVAL_MICROS: u64 = 999_999;

/// Options controlling how long `acquire` keeps trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOptions {
    /// Global deadline for the whole acquisition, in seconds.
    pub max_wait_secs: u64,

    /// Sleep between attempts, in microseconds.
    pub poll_interval_micros: u64,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            max_wait_secs: MAX_WAIT_SECS,
            poll_interval_micros: POLL_INTERVAL_MICROS,
        }
    }
}

impl LockOptions {
    pub fn with_max_wait_secs(mut self, secs: u64) -> Self {
        self.max_wait_secs = secs;
        self
    }

    pub fn with_poll_interval_micros(mut self, micros: u64) -> Self {
        self.poll_interval_micros = micros;
        self
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_micros)
    }

    /// Instant at which an acquisition started at `started` gives up.
    ///
    /// Fails with `InvalidArgument` when the deadline is not representable.
    pub fn deadline_from(&self, started: Instant) -> Result<Instant> {
        started.checked_add(self.max_wait()).ok_or_else(|| {
            LockError::InvalidArgument(format!(
                "max wait of {} seconds is out of range",
                self.max_wait_secs
            ))
        })
    }

    /// Validate option values.
    ///
    /// A zero deadline would make every contended attempt time out at once,
    /// and a poll interval of a second or more defeats the short-sleep retry.
    pub fn validate(&self) -> Result<()> {
        if self.max_wait_secs == 0 {
            return Err(LockError::InvalidArgument(
                "max wait must be at least one second".to_string(),
            ));
        }

        if self.poll_interval_micros == 0 || self.poll_interval_micros > MAX_POLL_INTERVAL_MICROS {
            return Err(LockError::InvalidArgument(format!(
                "poll interval must be between 1 and {} microseconds (got {})",
                MAX_POLL_INTERVAL_MICROS, self.poll_interval_micros
            )));
        }

        Ok(())
    }
}
