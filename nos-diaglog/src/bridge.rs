//! `log` crate bridge
//!
//! Routes records from the `log` facade into a [`LogContext`], so that
//! libraries logging through `log` end up in the same ring (and on every
//! drain) as direct `print` calls.

use alloc::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::context::LogContext;
use crate::platform::Platform;

/// `log::Log` implementation writing into a log context
pub struct LogBridge<P: Platform, const CAP: usize, const N: usize> {
    ctx: Arc<LogContext<P, CAP, N>>,
    level: LevelFilter,
}

impl<P: Platform, const CAP: usize, const N: usize> LogBridge<P, CAP, N> {
    pub fn new(ctx: Arc<LogContext<P, CAP, N>>, level: LevelFilter) -> Self {
        Self { ctx, level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Install as the process logger
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

impl<P: Platform, const CAP: usize, const N: usize> Log for LogBridge<P, CAP, N> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.ctx.print(format_args!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagConfig;
    use crate::cursor::DrainHandle;
    use crate::sink::NullSink;
    use crate::testing::TestPlatform;
    use log::Level;

    #[test]
    fn test_records_land_in_ring() {
        let platform = Arc::new(TestPlatform::new());
        platform.freeze_at(2_000);
        let ctx = Arc::new(LogContext::<TestPlatform, 256, 3>::new(platform, DiagConfig::default()).unwrap());
        ctx.init().unwrap();
        let handle = ctx.reserve(Arc::new(NullSink)).unwrap();
        let bridge = LogBridge::new(ctx.clone(), LevelFilter::Info);

        bridge.log(
            &Record::builder()
                .level(Level::Warn)
                .target("wifi")
                .args(format_args!("link lost"))
                .build(),
        );
        bridge.log(
            &Record::builder()
                .level(Level::Debug)
                .target("wifi")
                .args(format_args!("filtered"))
                .build(),
        );

        let mut buf = [0u8; 64];
        let n = ctx.drain(handle, &mut buf);
        assert_eq!(&buf[..n], b"0:00:00.002: [WARN] wifi: link lost\n");
        assert_eq!(ctx.drain(DrainHandle::new(1), &mut buf), 0);
    }
}
