//! Re-entrant lock with a bounded wait
//!
//! The write path can be reached from code that already holds the context
//! lock (a sink that logs, the `log` bridge reporting on the log itself), so
//! the owning task may take the lock again. Everyone else spins for at most
//! the configured timeout and then gives up.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::Deref;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::platform::Platform;

const UNOWNED: usize = 0;

/// Recursive mutual exclusion handing out shared access to `T`
///
/// Mutation goes through interior mutability inside `T`; the lock only
/// guarantees that a single task is inside at a time.
pub struct ReentrantLock<T> {
    /// Task id of the owner, `UNOWNED` when free
    owner: AtomicUsize,
    /// Lock depth; only touched by the owner
    depth: UnsafeCell<u32>,
    data: T,
}

// Safety: `data` is only reachable through a guard, and guards only exist on
// the single owning task. Ownership is keyed on `Platform::task_id`, which
// the unsafe `Platform` contract makes unique per concurrently running task.
unsafe impl<T: Send> Send for ReentrantLock<T> {}
unsafe impl<T: Send> Sync for ReentrantLock<T> {}

impl<T> ReentrantLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            owner: AtomicUsize::new(UNOWNED),
            depth: UnsafeCell::new(0),
            data,
        }
    }

    /// Acquire the lock, waiting at most `timeout_us`
    pub fn try_lock_for<P: Platform + ?Sized>(
        &self,
        platform: &P,
        timeout_us: u64,
    ) -> Option<ReentrantGuard<'_, T>> {
        let me = platform.task_id();
        debug_assert_ne!(me, UNOWNED, "task ids must be non-zero");

        if self.owner.load(Ordering::Acquire) == me {
            // Safety: ids are unique per task, so a match means we own the lock
            unsafe { *self.depth.get() += 1 };
            return Some(ReentrantGuard::new(self));
        }

        let start = platform.uptime_us();
        loop {
            if self
                .owner
                .compare_exchange_weak(UNOWNED, me, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                // Safety: we just became the owner
                unsafe { *self.depth.get() = 1 };
                return Some(ReentrantGuard::new(self));
            }
            if platform.uptime_us().saturating_sub(start) >= timeout_us {
                return None;
            }
            platform.yield_now();
        }
    }

    /// Acquire without waiting
    pub fn try_lock<P: Platform + ?Sized>(&self, platform: &P) -> Option<ReentrantGuard<'_, T>> {
        self.try_lock_for(platform, 0)
    }

    pub fn is_locked(&self) -> bool {
        self.owner.load(Ordering::Relaxed) != UNOWNED
    }

    pub fn into_inner(self) -> T {
        self.data
    }

    fn unlock(&self) {
        // Safety: only the owner drops guards
        unsafe {
            let depth = &mut *self.depth.get();
            *depth -= 1;
            if *depth == 0 {
                self.owner.store(UNOWNED, Ordering::Release);
            }
        }
    }
}

/// RAII guard for [`ReentrantLock`]; stays on the task that took it
pub struct ReentrantGuard<'a, T> {
    lock: &'a ReentrantLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T> ReentrantGuard<'a, T> {
    fn new(lock: &'a ReentrantLock<T>) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }
}

impl<T> Deref for ReentrantGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.lock.data
    }
}

impl<T> Drop for ReentrantGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
