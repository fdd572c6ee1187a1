//! Internal diagnostics for the host runtime, compiled out without `log`

macro_rules! host_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::debug!(target: "nos_diaglog_host", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = format_args!($($arg)*); }
    }
}

macro_rules! host_info {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::info!(target: "nos_diaglog_host", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = format_args!($($arg)*); }
    }
}

macro_rules! host_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!(target: "nos_diaglog_host", $($arg)*);
        #[cfg(not(feature = "log"))]
        { let _ = format_args!($($arg)*); }
    }
}
