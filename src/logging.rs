//! Logging setup: stdout, plus an optional log file

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging to stdout and, if `log_file` is given, to that file
///
/// Both outputs use the level from `RUST_LOG`, defaulting to `info`. The
/// returned guard flushes the file writer on drop; hold it until exit.
pub fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map_or_else(|| "nntp-auth-proxy.log".into(), |n| n.to_os_string());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(env_filter()),
        )
        .with(file_layer)
        .init();

    guard
}
