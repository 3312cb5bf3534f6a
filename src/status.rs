//! Plain-text backend status page
//!
//! `GET <path>` answers with one line per backend in configuration order:
//!
//! ```text
//! news1 - 3 / 10
//! news2 - 0 / 4
//! ```

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use std::fmt::Write;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::StatusConfig;
use crate::registry::{BackendLoad, ConnectionRegistry};

/// Render the backend table
#[must_use]
pub fn render(loads: &[BackendLoad]) -> String {
    loads.iter().fold(String::new(), |mut out, load| {
        let _ = writeln!(out, "{} - {} / {}", load.name, load.active, load.capacity);
        out
    })
}

async fn backend_status(State(registry): State<Arc<ConnectionRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render(&registry.snapshot()),
    )
}

/// Router serving the status table at `path`
pub fn build_router(path: &str, registry: Arc<ConnectionRegistry>) -> Router {
    Router::new()
        .route(path, get(backend_status))
        .with_state(registry)
}

/// Run the status server until `shutdown` resolves
///
/// Failing to bind is logged and returns; the proxy keeps serving clients.
pub async fn serve<F>(config: &StatusConfig, registry: Arc<ConnectionRegistry>, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind status page on {}: {}", addr, e);
            return;
        }
    };
    info!("Status page at http://{}{}", addr, config.path);

    let router = build_router(&config.path, registry);
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("Status server error: {}", e);
    }
}
