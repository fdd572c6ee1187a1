//! Drain sinks
//!
//! A sink accepts the byte runs the dispatch loop pulls from the ring for one
//! drain. Sinks are called with the context lock held; they may copy the run
//! but must not hold on to it, and must not block for long.
//!
//! - [`NullSink`]: discards everything; backs the sentinel drain
//! - [`ConsoleSink`]: echoes to the platform console
//! - [`QueueSink`]: bounded hand-off queue for a transport task (sockets)
//! - [`FnSink`]: adapts a closure

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::{Deque, Vec};
use spin::Mutex;

use crate::cursor::DrainHandle;
use crate::platform::Platform;

/// Consumer of drained log bytes
#[cfg_attr(test, mockall::automock)]
pub trait DrainSink: Send + Sync {
    /// Take a run of bytes drained for `handle`
    fn accept(&self, bytes: &[u8], handle: DrainHandle);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DrainSink for NullSink {
    fn accept(&self, _bytes: &[u8], _handle: DrainHandle) {}
}

/// Sink writing straight to the platform console
pub struct ConsoleSink<P: Platform> {
    platform: Arc<P>,
}

impl<P: Platform> ConsoleSink<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }
}

impl<P: Platform> DrainSink for ConsoleSink<P> {
    fn accept(&self, bytes: &[u8], _handle: DrainHandle) {
        self.platform.console_write(bytes);
    }
}

/// Closure-backed sink
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(&[u8], DrainHandle) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> DrainSink for FnSink<F>
where
    F: Fn(&[u8], DrainHandle) + Send + Sync,
{
    fn accept(&self, bytes: &[u8], handle: DrainHandle) {
        (self.0)(bytes, handle)
    }
}

/// Default queue depth for socket sinks
pub const QUEUE_DEPTH: usize = 10;

/// Default chunk size for socket sinks
pub const QUEUE_CHUNK_LEN: usize = 48;

/// One queued transport chunk
pub type Chunk<const LEN: usize> = Vec<u8, LEN>;

/// Bounded queue between the dispatch loop and a transport task
///
/// Runs are split into chunks of at most `LEN` bytes. When the queue is full
/// the remaining chunks of the run are dropped and counted; the transport
/// simply sees a gap, as with ring overwrite.
pub struct QueueSink<const DEPTH: usize = QUEUE_DEPTH, const LEN: usize = QUEUE_CHUNK_LEN> {
    queue: Mutex<Deque<Chunk<LEN>, DEPTH>>,
    dropped: AtomicUsize,
}

impl<const DEPTH: usize, const LEN: usize> QueueSink<DEPTH, LEN> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Deque::new()),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Take the oldest queued chunk
    pub fn pop(&self) -> Option<Chunk<LEN>> {
        self.queue.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Bytes discarded because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const DEPTH: usize, const LEN: usize> Default for QueueSink<DEPTH, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DEPTH: usize, const LEN: usize> DrainSink for QueueSink<DEPTH, LEN> {
    fn accept(&self, bytes: &[u8], _handle: DrainHandle) {
        let mut queue = self.queue.lock();
        for piece in bytes.chunks(LEN) {
            let mut chunk = Chunk::<LEN>::new();
            // Cannot fail: `piece` is at most LEN bytes
            let _ = chunk.extend_from_slice(piece);
            if queue.push_back(chunk).is_err() {
                self.dropped.fetch_add(piece.len(), Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestPlatform;

    #[test]
    fn test_queue_sink_chunks_runs() {
        let sink: QueueSink<4, 4> = QueueSink::new();
        sink.accept(b"abcdefghij", DrainHandle::new(1));
        assert_eq!(sink.len(), 3);
        assert_eq!(&sink.pop().unwrap()[..], b"abcd");
        assert_eq!(&sink.pop().unwrap()[..], b"efgh");
        assert_eq!(&sink.pop().unwrap()[..], b"ij");
        assert!(sink.pop().is_none());
    }

    #[test]
    fn test_queue_sink_drops_when_full() {
        let sink: QueueSink<2, 4> = QueueSink::new();
        sink.accept(b"0123456789", DrainHandle::new(1));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.dropped(), 2);
    }

    #[test]
    fn test_console_sink_writes_through() {
        let platform = Arc::new(TestPlatform::new());
        let sink = ConsoleSink::new(platform.clone());
        sink.accept(b"hello", DrainHandle::new(1));
        assert_eq!(platform.console(), b"hello");
    }

    #[test]
    fn test_fn_sink_receives_handle() {
        let seen = AtomicUsize::new(0);
        let sink = FnSink::new(|bytes: &[u8], handle: DrainHandle| {
            seen.store(bytes.len() * 10 + handle.index(), Ordering::SeqCst);
        });
        sink.accept(b"abc", DrainHandle::new(2));
        assert_eq!(seen.load(Ordering::SeqCst), 32);
    }
}
