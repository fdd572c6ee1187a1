//! Dispatch-task service
//!
//! [`DiagService`] owns a [`HostContext`] and the thread that drives its
//! [`DispatchTask`]. The thread is spawned by the first call to
//! [`DiagService::init`], which (like every later call) blocks until the task
//! has validated the ring and registered its drains.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nos_diaglog::context::RingOrigin;
use nos_diaglog::{DiagError, DispatchTask, LogContext};

use crate::HostContext;
use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::platform::StdPlatform;

const READY_POLL: Duration = Duration::from_millis(1);

/// Ring origin reported by the dispatch task once it is ready
type Startup = spin::Once<RingOrigin>;

/// Start-up error of a dispatch task that gave up; taken by one `init` caller
type Failure = spin::Mutex<Option<DiagError>>;

pub struct DiagService {
    ctx: Arc<HostContext>,
    config: HostConfig,
    ready: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    startup: Arc<Startup>,
    failure: Arc<Failure>,
    worker: spin::Mutex<Option<JoinHandle<()>>>,
}

impl DiagService {
    pub fn new(config: HostConfig) -> Result<Self> {
        config.validate()?;
        let ctx = LogContext::new(Arc::new(StdPlatform::new()), config.diag)?;
        Ok(Self {
            ctx: Arc::new(ctx),
            config,
            ready: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            startup: Arc::new(Startup::new()),
            failure: Arc::new(Failure::new(None)),
            worker: spin::Mutex::new(None),
        })
    }

    pub fn context(&self) -> &Arc<HostContext> {
        &self.ctx
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Whether the dispatch task has finished start-up
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Start the dispatch task if needed and wait until it is ready
    ///
    /// A failed start-up is reported to one caller and forgotten; the next
    /// call spawns a fresh task.
    pub fn init(&self) -> Result<RingOrigin> {
        loop {
            if let Some(origin) = self.startup.get() {
                return Ok(*origin);
            }
            {
                let mut worker = self.worker.lock();
                if let Some(err) = self.failure.lock().take() {
                    if let Some(failed) = worker.take() {
                        let _ = failed.join();
                    }
                    return Err(err.into());
                }
                if worker.is_none() {
                    if self.stop.load(Ordering::Acquire) {
                        return Err(HostError::Stopped);
                    }
                    *worker = Some(self.spawn()?);
                }
            }
            thread::sleep(READY_POLL);
        }
    }

    fn spawn(&self) -> Result<JoinHandle<()>> {
        let ctx = self.ctx.clone();
        let ready = self.ready.clone();
        let stop = self.stop.clone();
        let startup = self.startup.clone();
        let failure = self.failure.clone();
        let with_console = self.config.with_console;

        let handle = thread::Builder::new()
            .name("diaglog-dispatch".into())
            .spawn(move || {
                let mut task = DispatchTask::new(ctx);
                match task.start(&ready, with_console) {
                    Ok(origin) => {
                        startup.call_once(|| origin);
                        host_info!("dispatch task ready, ring {:?}", origin);
                        task.run(&stop);
                    }
                    Err(err) => {
                        host_warn!("dispatch task failed to start: {}", err);
                        *failure.lock() = Some(err);
                    }
                }
            })?;
        Ok(handle)
    }

    /// Route records from the `log` facade into this service's ring
    ///
    /// The bridge lives for the rest of the process.
    #[cfg(feature = "log")]
    pub fn install_log_bridge(&self, level: log::LevelFilter) -> Result<()> {
        let bridge: &'static _ = Box::leak(Box::new(nos_diaglog::LogBridge::new(self.ctx.clone(), level)));
        bridge.install().map_err(|_| HostError::LoggerInstalled)
    }

    /// Stop the dispatch task and wait for it to exit
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                host_warn!("dispatch task panicked");
            }
            host_debug!("dispatch task joined");
        }
    }
}

impl Drop for DiagService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nos_diaglog::{DrainHandle, FnSink, QueueSink};

    fn quiet() -> HostConfig {
        HostConfig::default()
            .with_console(false)
            .with_diag(nos_diaglog::DiagConfig::default().with_idle_period_ms(1))
    }

    #[test]
    fn test_init_is_idempotent() {
        let service = DiagService::new(quiet()).unwrap();
        assert!(!service.is_ready());
        assert_eq!(service.init().unwrap(), RingOrigin::Reset);
        assert!(service.is_ready());
        assert_eq!(service.init().unwrap(), RingOrigin::Reset);
        assert_eq!(service.context().drain_count(), 1);
    }

    #[test]
    fn test_console_drain_registered_on_start() {
        let service = DiagService::new(HostConfig::default()).unwrap();
        service.init().unwrap();
        assert_eq!(service.context().drain_count(), 2);
    }

    #[test]
    fn test_init_after_shutdown_fails() {
        let service = DiagService::new(quiet()).unwrap();
        service.shutdown();
        assert!(matches!(service.init(), Err(HostError::Stopped)));
    }

    #[test]
    fn test_transient_start_failure_is_retried() {
        let config = quiet().with_diag(
            nos_diaglog::DiagConfig::default()
                .with_idle_period_ms(1)
                .with_lock_timeout_us(2_000),
        );
        let service = DiagService::new(config).unwrap();
        let ctx = service.context().clone();
        ctx.init().unwrap();

        // Park a dispatch cycle inside a sink so the context lock stays taken
        let parked = Arc::new(AtomicBool::new(false));
        let resume = Arc::new(AtomicBool::new(false));
        let blocker = {
            let parked = parked.clone();
            let resume = resume.clone();
            FnSink::new(move |_bytes: &[u8], _handle: DrainHandle| {
                parked.store(true, Ordering::Release);
                while !resume.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };
        ctx.reserve(Arc::new(blocker)).unwrap();
        ctx.print_no_ts(format_args!("hold\n"));
        let holder = {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.dispatch_once())
        };
        while !parked.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(matches!(service.init(), Err(HostError::Diag(DiagError::LockTimeout))));
        assert!(!service.is_ready());

        resume.store(true, Ordering::Release);
        assert!(holder.join().unwrap());
        assert_eq!(service.init().unwrap(), RingOrigin::Retained);
        assert!(service.is_ready());
    }

    #[test]
    fn test_dispatch_thread_feeds_sinks() {
        let service = DiagService::new(quiet()).unwrap();
        service.init().unwrap();
        let queue = Arc::new(QueueSink::<10, 48>::new());
        service.context().reserve(queue.clone()).unwrap();
        service.context().print_no_ts(format_args!("ping\n"));

        let mut received = Vec::new();
        for _ in 0..500 {
            while let Some(chunk) = queue.pop() {
                received.extend_from_slice(&chunk);
            }
            if received.len() >= 5 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        service.shutdown();
        assert_eq!(received, b"ping\n");
    }
}
