//! Shared platform double for the integration tests

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use nos_diaglog::Platform;

static NEXT_TASK_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static TASK_ID: usize = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
}

pub struct HostPlatform {
    start: Instant,
    console: Mutex<Vec<u8>>,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            console: Mutex::new(Vec::new()),
        }
    }

    pub fn console(&self) -> Vec<u8> {
        self.console.lock().unwrap().clone()
    }
}

// Safety: ids come from a process-wide counter, one per thread
unsafe impl Platform for HostPlatform {
    fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn task_id(&self) -> usize {
        TASK_ID.with(|id| *id)
    }

    fn console_write(&self, bytes: &[u8]) {
        self.console.lock().unwrap().extend_from_slice(bytes);
    }

    fn sleep_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}
