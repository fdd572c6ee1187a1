//! Drain dispatch
//!
//! A dispatch cycle hands every registered drain, except the sentinel, at most
//! one chunk of its unread bytes. The cycle reports whether anything moved so
//! the task driving it can drain eagerly under load and sleep when idle.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::DRAIN_SCRATCH_LEN;
use crate::context::{LogContext, RingOrigin, RingState};
use crate::cursor::DrainHandle;
use crate::error::Result;
use crate::platform::Platform;
use crate::sink::ConsoleSink;

impl<P: Platform, const CAP: usize, const N: usize> LogContext<P, CAP, N> {
    /// Run one dispatch cycle; `true` when at least one drain received bytes
    ///
    /// The lock is held for the whole cycle, but the state itself is only
    /// borrowed while copying a chunk out, so sinks may call back into the
    /// context.
    pub fn dispatch_once(&self) -> bool {
        if !self.is_initialized() {
            return false;
        }
        let Some(guard) = self.lock() else {
            diag_trace!("dispatch skipped, lock busy");
            return false;
        };

        let chunk_len = self.config().drain_chunk_len.min(DRAIN_SCRATCH_LEN - 1);
        let mut scratch = [0u8; DRAIN_SCRATCH_LEN];
        let mut active = false;

        for index in 0..N {
            let handle = DrainHandle::new(index as u8);
            let (sink, len) = {
                let Ok(mut state) = guard.try_borrow_mut() else {
                    break;
                };
                if !state.registry.is_occupied(handle) || state.cursors.is_sentinel(handle) {
                    continue;
                }
                let RingState { store, cursors, registry } = &mut *state;
                let len = cursors.read_into(handle, store, &mut scratch[..chunk_len]);
                (registry.sink(handle), len)
            };
            if len == 0 {
                continue;
            }
            if let Some(sink) = sink {
                sink.accept(&scratch[..len], handle);
                active = true;
            }
        }

        drop(guard);
        active
    }
}

/// What the dispatch task should do after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Backlog remains; run the next cycle right away
    Busy,
    /// Nothing was drained; sleep for the given period
    Idle(u32),
}

/// Driver for the dedicated dispatch task
///
/// `start` performs the task's start-up (ring validation, sentinel and
/// console drains) and raises the readiness flag that `init` callers wait on;
/// `run` then cycles until the stop flag is raised.
pub struct DispatchTask<P: Platform, const CAP: usize, const N: usize> {
    ctx: Arc<LogContext<P, CAP, N>>,
    console: Option<DrainHandle>,
}

impl<P: Platform + 'static, const CAP: usize, const N: usize> DispatchTask<P, CAP, N> {
    pub fn new(ctx: Arc<LogContext<P, CAP, N>>) -> Self {
        Self { ctx, console: None }
    }

    pub fn context(&self) -> &Arc<LogContext<P, CAP, N>> {
        &self.ctx
    }

    /// Handle of the console drain registered by `start`
    pub fn console(&self) -> Option<DrainHandle> {
        self.console
    }

    /// Initialize the context, register the console drain and signal readiness
    pub fn start(&mut self, ready: &AtomicBool, with_console: bool) -> Result<RingOrigin> {
        let origin = self.ctx.init()?;
        if with_console && self.console.is_none() {
            let sink = ConsoleSink::new(self.ctx.platform().clone());
            self.console = Some(self.ctx.reserve(Arc::new(sink))?);
        }
        ready.store(true, Ordering::Release);
        Ok(origin)
    }

    /// One cycle and the resulting cadence
    pub fn run_cycle(&self) -> Cadence {
        if self.ctx.dispatch_once() {
            Cadence::Busy
        } else {
            Cadence::Idle(self.ctx.config().idle_period_ms)
        }
    }

    /// Cycle until `stop` is raised, sleeping only when idle
    pub fn run(&self, stop: &AtomicBool) {
        let platform = self.ctx.platform();
        while !stop.load(Ordering::Acquire) {
            match self.run_cycle() {
                Cadence::Busy => platform.yield_now(),
                Cadence::Idle(period_ms) => platform.sleep_ms(period_ms),
            }
        }
        diag_debug!("dispatch task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagConfig;
    use crate::sink::{MockDrainSink, NullSink};
    use crate::testing::TestPlatform;

    type Ctx = LogContext<TestPlatform, 128, 4>;

    fn context(chunk_len: usize) -> Arc<Ctx> {
        let config = DiagConfig::default().with_drain_chunk_len(chunk_len);
        let ctx = Arc::new(Ctx::new(Arc::new(TestPlatform::new()), config).unwrap());
        ctx.init().unwrap();
        ctx
    }

    #[test]
    fn test_idle_cycle_reports_no_work() {
        let ctx = context(8);
        ctx.reserve(Arc::new(NullSink)).unwrap();
        assert!(!ctx.dispatch_once());
    }

    #[test]
    fn test_cycle_hands_out_bounded_chunks() {
        let ctx = context(4);
        let mut sink = MockDrainSink::new();
        let handle = DrainHandle::new(1);
        let mut seq = mockall::Sequence::new();
        sink.expect_accept()
            .withf(move |bytes: &[u8], h: &DrainHandle| bytes == b"abcd" && *h == handle)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_accept()
            .withf(move |bytes: &[u8], h: &DrainHandle| bytes == b"ef" && *h == handle)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        assert_eq!(ctx.reserve(Arc::new(sink)).unwrap(), handle);

        ctx.print_no_ts(format_args!("abcdef"));
        assert!(ctx.dispatch_once());
        assert!(ctx.dispatch_once());
        assert!(!ctx.dispatch_once());
    }

    #[test]
    fn test_sentinel_is_never_fed() {
        let ctx = context(8);
        ctx.print_no_ts(format_args!("unread"));
        // Only the sentinel is registered
        assert!(!ctx.dispatch_once());
        assert_eq!(ctx.unread(ctx.sentinel().unwrap()), 6);
    }

    #[test]
    fn test_every_drain_gets_a_turn() {
        let ctx = context(8);
        let mut first = MockDrainSink::new();
        first
            .expect_accept()
            .withf(|bytes: &[u8], h: &DrainHandle| bytes == b"hi" && h.index() == 1)
            .times(1)
            .return_const(());
        let mut second = MockDrainSink::new();
        second
            .expect_accept()
            .withf(|bytes: &[u8], h: &DrainHandle| bytes == b"hi" && h.index() == 2)
            .times(1)
            .return_const(());
        ctx.reserve(Arc::new(first)).unwrap();
        ctx.reserve(Arc::new(second)).unwrap();
        ctx.print_no_ts(format_args!("hi"));
        assert!(ctx.dispatch_once());
    }

    #[test]
    fn test_task_start_registers_console() {
        let ctx = Arc::new(Ctx::new(Arc::new(TestPlatform::new()), DiagConfig::default()).unwrap());
        let ready = AtomicBool::new(false);
        let mut task = DispatchTask::new(ctx.clone());
        assert_eq!(task.start(&ready, true).unwrap(), RingOrigin::Reset);
        assert!(ready.load(Ordering::Acquire));
        assert_eq!(task.console(), Some(DrainHandle::new(1)));

        ctx.print_no_ts(format_args!("to console\n"));
        assert_eq!(task.run_cycle(), Cadence::Busy);
        assert_eq!(task.run_cycle(), Cadence::Idle(10));
        assert_eq!(ctx.platform().console(), b"to console\n");
    }

    #[test]
    fn test_run_returns_when_stopped() {
        let ctx = context(8);
        let task = DispatchTask::new(ctx);
        let stop = AtomicBool::new(true);
        task.run(&stop);
    }
}
