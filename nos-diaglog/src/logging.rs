//! Unified logging support for nos-diaglog
//!
//! Internal diagnostics go through these macros so that the crate builds the
//! same way with and without the `log` feature. Without it the arguments are
//! still type-checked and marked as used, but nothing is emitted.
//!
//! The producer-facing macros, [`diag_print!`] and [`diag_print_no_ts!`], are
//! exported and write into a [`LogContext`](crate::LogContext).

/// Trace-level internal diagnostic
macro_rules! diag_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!(target: "nos_diaglog", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = core::format_args!($($arg)*); }
    }
}

/// Debug-level internal diagnostic
macro_rules! diag_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::debug!(target: "nos_diaglog", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = core::format_args!($($arg)*); }
    }
}

/// Info-level internal diagnostic
macro_rules! diag_info {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::info!(target: "nos_diaglog", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = core::format_args!($($arg)*); }
    }
}

/// Warn-level internal diagnostic
macro_rules! diag_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!(target: "nos_diaglog", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = core::format_args!($($arg)*); }
    }
}

/// Emit a timestamped, formatted message into a log context
///
/// ```rust,ignore
/// diag_print!(ctx, "link up after {} ms\n", elapsed);
/// ```
#[macro_export]
macro_rules! diag_print {
    ($ctx:expr, $($arg:tt)*) => {
        $ctx.print(core::format_args!($($arg)*))
    };
}

/// Emit a formatted message into a log context without the uptime prefix
#[macro_export]
macro_rules! diag_print_no_ts {
    ($ctx:expr, $($arg:tt)*) => {
        $ctx.print_no_ts(core::format_args!($($arg)*))
    };
}
