//! The core module of the batch driver.
//!
//! This module contains the pieces every other component depends on:
//! - Run configuration and its layered resolution
//! - Constants (default file locations, table widths, class names)
//! - Error handling
//! - Logging setup

pub mod config;
pub mod constants;
pub mod errors;

pub use config::{ConfigOverlay, RunConfig, parse_boolish, parse_boolish_arg};
pub use constants::*;
pub use errors::{ProcessingStage, SubCellError, SubCellResult};

use std::path::Path;

/// Initializes the tracing subscriber for logging.
///
/// Log lines go to the console and to `log_file`, which is truncated first.
/// The level defaults to `info` and can be changed through `RUST_LOG`.
pub fn init_tracing(log_file: &Path) -> SubCellResult<()> {
    use std::sync::Mutex;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let file = std::fs::File::create(log_file)
        .map_err(|e| SubCellError::io("create log file", log_file, e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time().with_target(false))
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .without_time()
                .with_target(false),
        )
        .try_init()
        .map_err(|e| {
            SubCellError::processing_error(
                ProcessingStage::Configuration,
                "installing the log subscriber",
                e,
            )
        })
}

/// Captures the log lines emitted on the current thread.
#[cfg(test)]
pub(crate) mod test_logs {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with a plain-text subscriber and returns its result and output.
    pub(crate) fn capture<R>(f: impl FnOnce() -> R) -> (R, String) {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        (result, String::from_utf8_lossy(&bytes).into_owned())
    }
}
