//! Tracing setup for the binary

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "isofetch=info";

/// Filter for the stderr layer enabled by `--verbose`
pub const VERBOSE_FILTER: &str = "isofetch=debug";

/// Log JSON lines to `log_path`, and human-readable lines to stderr when
/// `verbose` is set.
///
/// The returned guard flushes the file writer when dropped.
pub fn init(log_path: &Path, verbose: bool) -> io::Result<WorkerGuard> {
    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_filter(filter(DEFAULT_FILTER));
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(filter(VERBOSE_FILTER))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(io::Error::other)?;
    Ok(guard)
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
