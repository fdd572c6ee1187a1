//! Runtime configuration for the diagnostic log
//!
//! Sizes that determine memory layout (ring capacity, slot count) are const
//! generics on [`LogContext`](crate::LogContext). Everything here can be
//! chosen at start-up.

use crate::DRAIN_SCRATCH_LEN;
use crate::error::{DiagError, Result};

/// Default bounded wait for the context lock (microseconds)
pub const DEFAULT_LOCK_TIMEOUT_US: u64 = 10_000;

/// Default dispatch sleep when no drain had anything to read (milliseconds)
pub const DEFAULT_IDLE_PERIOD_MS: u32 = 10;

/// Default number of bytes handed to a sink per dispatch cycle
pub const DEFAULT_DRAIN_CHUNK_LEN: usize = DRAIN_SCRATCH_LEN - 1;

/// Diagnostic log configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagConfig {
    /// Maximum time spent waiting for the context lock
    pub lock_timeout_us: u64,
    /// Dispatch task sleep when idle
    pub idle_period_ms: u32,
    /// Upper bound on bytes drained per sink per cycle
    pub drain_chunk_len: usize,
}

impl Default for DiagConfig {
    fn default() -> Self {
        Self {
            lock_timeout_us: DEFAULT_LOCK_TIMEOUT_US,
            idle_period_ms: DEFAULT_IDLE_PERIOD_MS,
            drain_chunk_len: DEFAULT_DRAIN_CHUNK_LEN,
        }
    }
}

impl DiagConfig {
    pub fn with_lock_timeout_us(mut self, timeout_us: u64) -> Self {
        self.lock_timeout_us = timeout_us;
        self
    }

    pub fn with_idle_period_ms(mut self, period_ms: u32) -> Self {
        self.idle_period_ms = period_ms;
        self
    }

    pub fn with_drain_chunk_len(mut self, chunk_len: usize) -> Self {
        self.drain_chunk_len = chunk_len;
        self
    }

    /// Check the configuration against the fixed scratch sizes
    pub fn validate(&self) -> Result<()> {
        if self.drain_chunk_len == 0 {
            return Err(DiagError::InvalidConfig("drain chunk length must be non-zero"));
        }
        if self.drain_chunk_len >= DRAIN_SCRATCH_LEN {
            return Err(DiagError::InvalidConfig(
                "drain chunk length must be smaller than the transfer scratch",
            ));
        }
        Ok(())
    }
}
