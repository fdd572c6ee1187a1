//! Thread-backed platform

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use nos_diaglog::Platform;

lazy_static! {
    static ref BOOT: Instant = Instant::now();
}

static NEXT_TASK_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static TASK_ID: usize = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
}

/// Platform over std threads; uptime counts from the first use of any instance
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPlatform;

impl StdPlatform {
    pub fn new() -> Self {
        lazy_static::initialize(&BOOT);
        Self
    }
}

// Safety: ids come from a process-wide counter, one per thread
unsafe impl Platform for StdPlatform {
    fn uptime_us(&self) -> u64 {
        BOOT.elapsed().as_micros() as u64
    }

    fn task_id(&self) -> usize {
        TASK_ID.with(|id| *id)
    }

    fn console_write(&self, bytes: &[u8]) {
        let mut out = std::io::stdout().lock();
        // Nowhere left to report a failing stdout
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn sleep_ms(&self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn yield_now(&self) {
        thread::yield_now();
    }
}
