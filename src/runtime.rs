//! Tokio runtime configuration and shutdown signal handling

use anyhow::Result;
use tracing::{info, warn};

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    worker_threads: usize,
}

impl RuntimeConfig {
    /// Create runtime config from an optional thread count
    ///
    /// `None` means one thread; `Some(0)` means one per CPU core.
    #[must_use]
    pub fn from_args(threads: Option<usize>) -> Self {
        let worker_threads = match threads {
            None => 1,
            Some(0) => std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
            Some(n) => n,
        };
        Self { worker_threads }
    }

    #[must_use]
    pub const fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    #[must_use]
    pub const fn is_single_threaded(&self) -> bool {
        self.worker_threads == 1
    }

    /// Build either a current-thread or a multi-threaded runtime
    ///
    /// # Errors
    /// Returns error if runtime creation fails
    pub fn build_runtime(self) -> Result<tokio::runtime::Runtime> {
        let rt = if self.is_single_threaded() {
            info!("Starting NNTP proxy with single-threaded runtime");
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
        } else {
            info!(
                "Starting NNTP proxy with {} worker threads",
                self.worker_threads
            );
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(self.worker_threads)
                .enable_all()
                .build()?
        };
        Ok(rt)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_args(None)
    }
}

/// Wait for Ctrl+C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
