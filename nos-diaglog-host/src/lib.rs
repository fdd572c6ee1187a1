//! NOS Diagnostic Log host runtime
//!
//! Hosted collaborators for [`nos_diaglog`]:
//!
//! - [`StdPlatform`]: uptime since process start, per-thread task identities,
//!   stdout as the console
//! - [`DiagService`]: owns the dispatch thread; `init` blocks until the ring is
//!   ready
//! - [`TcpDrainServer`]: streams the log to connected TCP (telnet) clients,
//!   one drain per client

#[macro_use]
mod logging;

pub mod config;
pub mod error;
pub mod platform;
pub mod service;
pub mod tcp;

pub use crate::config::HostConfig;
pub use crate::error::{HostError, Result};
pub use crate::platform::StdPlatform;
pub use crate::service::DiagService;
pub use crate::tcp::{PollStats, TcpDrainServer};

/// Log context with the default ring capacity and slot count
pub type HostContext = nos_diaglog::LogContext<StdPlatform>;
