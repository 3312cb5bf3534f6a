//! Client accept loop

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::{NntpProxy, is_client_disconnect_error};

/// Bind the client listener and log where it is
///
/// # Errors
/// Returns error if binding fails
pub async fn bind(listen_addr: &str, tls: bool) -> Result<TcpListener> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind client listener on {}", listen_addr))?;
    info!(
        "NNTP proxy listening on {} ({})",
        listen_addr,
        if tls { "TLS" } else { "plain" }
    );
    Ok(listener)
}

/// Accept clients until `shutdown` resolves
///
/// Each connection is served on its own task. A failed accept is logged and
/// the loop keeps going; sessions already running are left to finish.
pub async fn serve<F>(proxy: Arc<NntpProxy>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown initiated, stopping accept loop");
                break;
            }

            accept_result = listener.accept() => {
                let (stream, addr) = match accept_result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept client connection: {}", e);
                        continue;
                    }
                };
                let proxy = Arc::clone(&proxy);

                tokio::spawn(async move {
                    if let Err(e) = proxy.handle_client(stream, addr).await {
                        if is_client_disconnect_error(&e) {
                            debug!("Client {} disconnected: {:#}", addr, e);
                        } else {
                            error!("Error handling client {}: {:#}", addr, e);
                        }
                    }
                });
            }
        }
    }

    info!(
        "Proxy stopped accepting; {} client(s) still connected",
        proxy.active_clients()
    );
    Ok(())
}
