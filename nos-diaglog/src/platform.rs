//! Platform interface
//!
//! The core never talks to an OS directly. Clock, task identity, the default
//! console and sleeping are all provided by an implementation of [`Platform`].

/// Services the diagnostic log needs from the surrounding system
///
/// # Safety
///
/// [`task_id`](Platform::task_id) decides ownership of the context lock. It
/// must return a non-zero value that stays the same for the calling task and
/// differs from the value of every other task that may use the same context
/// at the same time. Handing two tasks the same id lets both past the lock at
/// once.
///
/// A plain `impl` is rejected:
///
/// ```compile_fail
/// struct Fixed;
///
/// impl nos_diaglog::Platform for Fixed {
///     fn uptime_us(&self) -> u64 { 0 }
///     fn task_id(&self) -> usize { 1 }
///     fn console_write(&self, _bytes: &[u8]) {}
///     fn sleep_ms(&self, _ms: u32) {}
/// }
/// ```
pub unsafe trait Platform: Send + Sync {
    /// Monotonic time since boot in microseconds
    fn uptime_us(&self) -> u64;

    /// Identity of the calling task, see the trait-level safety contract
    fn task_id(&self) -> usize;

    /// Direct, unbuffered console output
    fn console_write(&self, bytes: &[u8]);

    /// Put the calling task to sleep
    fn sleep_ms(&self, ms: u32);

    /// Let another task run while spinning on the lock
    fn yield_now(&self) {
        core::hint::spin_loop();
    }
}

/// Split an uptime into hours, minutes, seconds and milliseconds
pub fn split_uptime(uptime_us: u64) -> (u64, u64, u64, u64) {
    let mut msec = uptime_us / 1000;
    let hours = msec / 3_600_000;
    msec %= 3_600_000;
    let minutes = msec / 60_000;
    msec %= 60_000;
    let seconds = msec / 1000;
    msec %= 1000;
    (hours, minutes, seconds, msec)
}
