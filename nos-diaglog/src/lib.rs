//! NOS Diagnostic Log
//!
//! This crate provides the diagnostic logging core used by NOS devices: a
//! fixed-capacity, in-memory ring buffer written by any number of producer
//! tasks and tailed concurrently by up to `N` independent drains, each at its
//! own pace.
//!
//! # Architecture
//!
//! The subsystem is organized into a handful of small components that share a
//! single re-entrant lock inside one [`LogContext`]:
//!
//! - **Store**: the ring bytes, the wrapping write cursor and the validity header
//! - **Cursor**: per-slot read positions, including the never-consumed sentinel
//! - **Registry**: slot arena mapping [`DrainHandle`]s to [`DrainSink`]s
//! - **Context**: the write path (`emit`) and consumer lifecycle (`reserve`,
//!   `release`, `rewind`, `drain`)
//! - **Dispatch**: one drain cycle over every registered sink, and the task
//!   driver that chooses between draining eagerly and sleeping
//!
//! Producers never block on a full buffer. A drain that falls behind has its
//! cursor pushed forward past overwritten bytes; this is the only backpressure.
//!
//! # Usage
//!
//! ```rust,ignore
//! use nos_diaglog::{DiagConfig, LogContext, diag_print};
//!
//! let ctx: LogContext<MyPlatform> = LogContext::new(platform, DiagConfig::default())?;
//! ctx.init();
//! diag_print!(ctx, "boot reason: {}\n", reason);
//! while ctx.dispatch_once() {}
//! ```

#![no_std]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
pub mod logging;

pub mod config;
pub mod context;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod platform;
pub mod registry;
pub mod sink;
pub mod store;
pub mod sync;

#[cfg(feature = "log")]
pub mod bridge;

// Re-export commonly used types
pub use crate::config::DiagConfig;
pub use crate::context::LogContext;
pub use crate::cursor::DrainHandle;
pub use crate::dispatch::{Cadence, DispatchTask};
pub use crate::error::{DiagError, Result};
pub use crate::platform::Platform;
pub use crate::sink::{ConsoleSink, DrainSink, FnSink, NullSink, QueueSink};
pub use crate::store::RingStore;

#[cfg(feature = "log")]
pub use crate::bridge::LogBridge;

/// Default ring capacity in bytes
pub const DEFAULT_CAPACITY: usize = 4 * 1024;

/// Default number of drain slots, the sentinel included
pub const DEFAULT_DRAIN_SLOTS: usize = 5;

/// Size of the per-message format scratch buffer
pub const MSG_SCRATCH_LEN: usize = 256;

/// Size of the dispatch transfer scratch; chunks are strictly smaller
pub const DRAIN_SCRATCH_LEN: usize = 32;

/// Header tag marking a ring image that has been initialized before
pub const VALIDITY_TAG: u32 = 0xE1F5_12ED;

static_assertions::const_assert!(DEFAULT_CAPACITY <= u16::MAX as usize);
static_assertions::const_assert!(DEFAULT_DRAIN_SLOTS >= 2);
static_assertions::const_assert!(DRAIN_SCRATCH_LEN < MSG_SCRATCH_LEN);

#[cfg(test)]
pub(crate) mod testing;
