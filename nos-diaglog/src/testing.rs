//! Test doubles shared by the unit tests

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use std::vec::Vec;

use spin::Mutex;

use crate::platform::Platform;

static NEXT_TASK_ID: AtomicUsize = AtomicUsize::new(1);

std::thread_local! {
    static TASK_ID: usize = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
}

/// Thread-backed platform with a capturable console and an optionally frozen clock
pub struct TestPlatform {
    start: Instant,
    frozen: AtomicBool,
    frozen_us: AtomicU64,
    console: Mutex<Vec<u8>>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frozen: AtomicBool::new(false),
            frozen_us: AtomicU64::new(0),
            console: Mutex::new(Vec::new()),
        }
    }

    /// Pin the clock; only for tests without lock contention
    pub fn freeze_at(&self, uptime_us: u64) {
        self.frozen_us.store(uptime_us, Ordering::SeqCst);
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn console(&self) -> Vec<u8> {
        self.console.lock().clone()
    }
}

// Safety: ids come from a process-wide counter, one per thread
unsafe impl Platform for TestPlatform {
    fn uptime_us(&self) -> u64 {
        if self.frozen.load(Ordering::SeqCst) {
            self.frozen_us.load(Ordering::SeqCst)
        } else {
            self.start.elapsed().as_micros() as u64
        }
    }

    fn task_id(&self) -> usize {
        TASK_ID.with(|id| *id)
    }

    fn console_write(&self, bytes: &[u8]) {
        self.console.lock().extend_from_slice(bytes);
    }

    fn sleep_ms(&self, ms: u32) {
        std::thread::sleep(core::time::Duration::from_millis(ms as u64));
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}
