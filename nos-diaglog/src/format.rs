//! Bounded message formatting
//!
//! Messages are rendered into a fixed scratch buffer before they reach the
//! ring. Output past the end of the scratch is dropped; formatting itself
//! keeps going so that a long argument never aborts the rest of the line.

use core::fmt::{self, Write};

use heapless::Vec;

use crate::platform::split_uptime;

/// Fixed-size formatting target that truncates instead of failing
pub struct ScratchWriter<const LEN: usize> {
    buf: Vec<u8, LEN>,
    truncated: bool,
}

impl<const LEN: usize> ScratchWriter<LEN> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            truncated: false,
        }
    }

    /// Render `args`, replacing any previous contents
    pub fn render(&mut self, args: fmt::Arguments<'_>) -> &[u8] {
        self.clear();
        // write_str never fails, so neither does write_fmt
        let _ = self.write_fmt(args);
        self.as_bytes()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.truncated = false;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Whether the last render lost output to the scratch limit
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<const LEN: usize> Default for ScratchWriter<LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LEN: usize> Write for ScratchWriter<LEN> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = LEN - self.buf.len();
        let bytes = s.as_bytes();
        let take = bytes.len().min(room);
        if take < bytes.len() {
            self.truncated = true;
        }
        // Cannot fail: `take` never exceeds the remaining capacity
        let _ = self.buf.extend_from_slice(&bytes[..take]);
        Ok(())
    }
}

/// Render the `H:MM:SS.mmm: ` uptime prefix
pub fn write_uptime_prefix<W: Write>(out: &mut W, uptime_us: u64) -> fmt::Result {
    let (hours, minutes, seconds, msec) = split_uptime(uptime_us);
    write!(out, "{}:{:02}:{:02}.{:03}: ", hours, minutes, seconds, msec)
}
