//! Log context
//!
//! One [`LogContext`] owns the ring store, the cursor table and the drain
//! registry behind a single re-entrant lock. It is shared by reference
//! counting between producer tasks, the dispatch task and transport
//! adapters; there is no hidden global.
//!
//! Every operation waits for the lock for at most
//! [`DiagConfig::lock_timeout_us`]. On timeout the write path falls back to
//! the platform console, `reserve` and `try_release` report
//! [`DiagError::LockTimeout`], and the remaining operations do nothing.

use alloc::sync::Arc;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::DiagConfig;
use crate::cursor::{CursorTable, DrainHandle};
use crate::error::{DiagError, Result};
use crate::format::{ScratchWriter, write_uptime_prefix};
use crate::platform::Platform;
use crate::registry::DrainRegistry;
use crate::sink::{DrainSink, NullSink};
use crate::store::RingStore;
use crate::sync::{ReentrantGuard, ReentrantLock};
use crate::{DEFAULT_CAPACITY, DEFAULT_DRAIN_SLOTS, MSG_SCRATCH_LEN};

/// How the ring image was found at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingOrigin {
    /// Header did not validate; the ring was reset to empty
    Reset,
    /// Header validated; contents from before the soft reset were kept
    Retained,
}

/// Lock-protected state
pub(crate) struct RingState<const CAP: usize, const N: usize> {
    pub(crate) store: RingStore<CAP>,
    pub(crate) cursors: CursorTable<N>,
    pub(crate) registry: DrainRegistry<N>,
}

impl<const CAP: usize, const N: usize> RingState<CAP, N> {
    /// Append bytes, pushing overtaken cursors past each overwritten byte
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let write_cursor = self.store.push(byte);
            self.cursors.catch_up::<CAP>(write_cursor);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.store.reset();
        self.cursors.reset();
    }
}

pub(crate) type StateLock<const CAP: usize, const N: usize> = ReentrantLock<RefCell<RingState<CAP, N>>>;
pub(crate) type StateGuard<'a, const CAP: usize, const N: usize> = ReentrantGuard<'a, RefCell<RingState<CAP, N>>>;

/// Shared diagnostic log context
pub struct LogContext<P: Platform, const CAP: usize = DEFAULT_CAPACITY, const N: usize = DEFAULT_DRAIN_SLOTS> {
    platform: Arc<P>,
    config: DiagConfig,
    initialized: AtomicBool,
    pub(crate) state: StateLock<CAP, N>,
}

impl<P: Platform, const CAP: usize, const N: usize> LogContext<P, CAP, N> {
    /// Create a context over cold memory; the ring is reset by [`init`](Self::init)
    pub fn new(platform: Arc<P>, config: DiagConfig) -> Result<Self> {
        Self::with_store(platform, config, RingStore::zeroed())
    }

    /// Create a context over a ring image that may have survived a soft reset
    pub fn with_store(platform: Arc<P>, config: DiagConfig, store: RingStore<CAP>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            platform,
            config,
            initialized: AtomicBool::new(false),
            state: ReentrantLock::new(RefCell::new(RingState {
                store,
                cursors: CursorTable::new(),
                registry: DrainRegistry::new(),
            })),
        })
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn config(&self) -> &DiagConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn lock(&self) -> Option<StateGuard<'_, CAP, N>> {
        self.state
            .try_lock_for(&*self.platform, self.config.lock_timeout_us)
    }

    /// Validate or reset the ring and register the sentinel drain
    ///
    /// Idempotent: later calls report [`RingOrigin::Retained`] and change nothing.
    pub fn init(&self) -> Result<RingOrigin> {
        let guard = self.lock().ok_or(DiagError::LockTimeout)?;
        if self.is_initialized() {
            return Ok(RingOrigin::Retained);
        }

        let (origin, sentinel) = {
            let mut state = guard.try_borrow_mut().map_err(|_| DiagError::LockTimeout)?;
            let origin = if state.store.validate_or_reset() {
                state.cursors.reset();
                RingOrigin::Reset
            } else {
                RingOrigin::Retained
            };
            let sentinel = state.registry.bind(Arc::new(NullSink))?;
            state.cursors.set_sentinel(sentinel);
            (origin, sentinel)
        };
        self.initialized.store(true, Ordering::Release);

        diag_info!("diagnostic ring {:?}, {} bytes, sentinel {}", origin, CAP, sentinel);
        drop(guard);
        Ok(origin)
    }

    /// Emit a formatted message, optionally prefixed with the uptime
    ///
    /// Before initialization, or when the lock cannot be taken in time, the
    /// message goes straight to the platform console without a prefix.
    pub fn emit(&self, args: fmt::Arguments<'_>, timestamp: bool) {
        let guard = if self.is_initialized() { self.lock() } else { None };
        let Some(guard) = guard else {
            self.emit_unbuffered(args);
            return;
        };

        let mut scratch: ScratchWriter<MSG_SCRATCH_LEN> = ScratchWriter::new();
        if timestamp {
            let _ = write_uptime_prefix(&mut scratch, self.platform.uptime_us());
            self.append_locked(&guard, scratch.as_bytes());
        }
        let message = scratch.render(args);
        self.append_locked(&guard, message);
    }

    /// Timestamped [`emit`](Self::emit)
    pub fn print(&self, args: fmt::Arguments<'_>) {
        self.emit(args, true);
    }

    /// [`emit`](Self::emit) without the uptime prefix
    pub fn print_no_ts(&self, args: fmt::Arguments<'_>) {
        self.emit(args, false);
    }

    fn emit_unbuffered(&self, args: fmt::Arguments<'_>) {
        let mut scratch: ScratchWriter<MSG_SCRATCH_LEN> = ScratchWriter::new();
        self.platform.console_write(scratch.render(args));
    }

    fn append_locked(&self, guard: &StateGuard<'_, CAP, N>, bytes: &[u8]) {
        match guard.try_borrow_mut() {
            Ok(mut state) => state.append(bytes),
            // Re-entered from inside a state borrow; keep the bytes visible somewhere
            Err(_) => self.platform.console_write(bytes),
        }
    }

    /// Register a drain; it starts at the oldest retained byte
    pub fn reserve(&self, sink: Arc<dyn DrainSink>) -> Result<DrainHandle> {
        if !self.is_initialized() {
            return Err(DiagError::NotInitialized);
        }
        let guard = self.lock().ok_or(DiagError::LockTimeout)?;
        let bound = {
            let mut state = guard.try_borrow_mut().map_err(|_| DiagError::LockTimeout)?;
            let bound = state.registry.bind(sink);
            if let Ok(handle) = bound {
                state.cursors.rewind(handle);
            }
            bound
        };
        match bound {
            Ok(handle) => {
                diag_debug!("reserved {}", handle);
            }
            Err(_) => {
                diag_warn!("drain registry full ({} slots)", N);
            }
        }
        drop(guard);
        bound
    }

    /// Unregister a drain; free, out-of-range and sentinel handles are ignored
    ///
    /// Does nothing when the lock cannot be taken in time; callers that must
    /// not lose the slot use [`try_release`](Self::try_release).
    pub fn release(&self, handle: DrainHandle) {
        let _ = self.try_release(handle);
    }

    /// [`release`](Self::release) that reports whether the slot was freed
    ///
    /// `Ok(false)` means there was nothing to release. `LockTimeout` leaves
    /// the drain registered; retrying later is safe.
    pub fn try_release(&self, handle: DrainHandle) -> Result<bool> {
        let guard = self.lock().ok_or(DiagError::LockTimeout)?;
        let released = {
            let mut state = guard.try_borrow_mut().map_err(|_| DiagError::LockTimeout)?;
            if state.cursors.is_sentinel(handle) {
                None
            } else {
                state.registry.unbind(handle)
            }
        };
        let freed = released.is_some();
        if freed {
            diag_debug!("released {}", handle);
        }
        // Last reference to the sink may drop here, outside the state borrow
        drop(released);
        drop(guard);
        Ok(freed)
    }

    /// Move a drain's cursor back to the oldest retained byte
    pub fn rewind(&self, handle: DrainHandle) {
        let Some(guard) = self.lock() else { return };
        if let Ok(mut state) = guard.try_borrow_mut() {
            state.cursors.rewind(handle);
        }
    }

    /// Copy up to `buf.len()` unread bytes for `handle`, advancing its cursor
    ///
    /// Never blocks beyond the lock wait; returns 0 when there is nothing to
    /// read, the handle is not a registered drain, or it is the sentinel.
    pub fn drain(&self, handle: DrainHandle, buf: &mut [u8]) -> usize {
        let Some(guard) = self.lock() else { return 0 };
        let Ok(mut state) = guard.try_borrow_mut() else { return 0 };
        if !state.registry.is_occupied(handle) || state.cursors.is_sentinel(handle) {
            return 0;
        }
        let RingState { store, cursors, .. } = &mut *state;
        cursors.read_into(handle, store, buf)
    }

    /// Discard all retained data and return every cursor to the start
    pub fn clear(&self) {
        let Some(guard) = self.lock() else { return };
        if let Ok(mut state) = guard.try_borrow_mut() {
            state.reset();
        }
    }

    fn inspect<R>(&self, f: impl FnOnce(&RingState<CAP, N>) -> R) -> Option<R> {
        let guard = self.lock()?;
        let state = guard.try_borrow().ok()?;
        Some(f(&state))
    }

    /// Current read position of a slot
    pub fn cursor_position(&self, handle: DrainHandle) -> Option<usize> {
        self.inspect(|state| state.cursors.position(handle)).flatten()
    }

    /// Bytes waiting for a slot
    pub fn unread(&self, handle: DrainHandle) -> usize {
        self.inspect(|state| state.cursors.unread(handle, &state.store))
            .unwrap_or(0)
    }

    /// Position of the oldest retained byte
    pub fn low_water_mark(&self) -> usize {
        self.inspect(|state| state.cursors.low_water_mark())
            .unwrap_or(0)
    }

    pub fn write_cursor(&self) -> usize {
        self.inspect(|state| state.store.write_cursor()).unwrap_or(0)
    }

    pub fn sentinel(&self) -> Option<DrainHandle> {
        self.inspect(|state| state.cursors.sentinel()).flatten()
    }

    pub fn is_registered(&self, handle: DrainHandle) -> bool {
        self.inspect(|state| state.registry.is_occupied(handle))
            .unwrap_or(false)
    }

    /// Number of occupied slots, the sentinel included
    pub fn drain_count(&self) -> usize {
        self.inspect(|state| state.registry.len()).unwrap_or(0)
    }

    /// Snapshot of the ring image, for carrying over a soft reset
    pub fn retained_store(&self) -> Option<RingStore<CAP>> {
        self.inspect(|state| state.store.clone())
    }
}
