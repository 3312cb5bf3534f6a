//! NNTP proxy implementation
//!
//! [`NntpProxy`] owns the collaborators every session shares and turns an
//! accepted TCP connection into a running [`ClientSession`].
//!
//! ## Module structure
//!
//! - [`listener`]: accept loop and per-client task spawning

pub mod listener;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::config::Config;
use crate::registry::ConnectionRegistry;
use crate::session::{ClientSession, SessionContext};
use crate::stream::ConnectionStream;
use crate::tls::TlsAcceptor;

#[derive(Debug, Clone)]
pub struct NntpProxy {
    ctx: Arc<SessionContext>,
    /// Present when the frontend has a certificate and key configured
    tls: Option<TlsAcceptor>,
    /// Number of currently connected clients
    active_clients: Arc<AtomicUsize>,
}

impl NntpProxy {
    /// Create a proxy from a validated configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use nntp_auth_proxy::{NntpProxy, load_config};
    /// # fn main() -> anyhow::Result<()> {
    /// let config = load_config("config.toml")?;
    /// let proxy = NntpProxy::new(&config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: &Config) -> Result<Self> {
        let tls = match (&config.frontend.tls_cert, &config.frontend.tls_key) {
            (Some(cert), Some(key)) => {
                let acceptor = TlsAcceptor::from_pem_files(cert, key)
                    .with_context(|| format!("Failed to set up frontend TLS from {}", cert.display()))?;
                info!("Frontend TLS enabled with certificate {}", cert.display());
                Some(acceptor)
            }
            _ => None,
        };

        let ctx = SessionContext::from_config(config)?;
        info!(
            "Proxy ready: {} backend(s), {} user(s), {} allowed command(s)",
            ctx.selector.backend_count(),
            ctx.credentials.len(),
            ctx.commands.allowed().len()
        );

        Ok(Self {
            ctx: Arc::new(ctx),
            tls,
            active_clients: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Serve one accepted client connection to completion
    ///
    /// Completes the TLS handshake first when the frontend is TLS-enabled.
    pub async fn handle_client(&self, stream: TcpStream, client_addr: SocketAddr) -> Result<()> {
        debug!("New client connection from {}", client_addr);
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", client_addr, e);
        }

        let stream = match &self.tls {
            Some(acceptor) => {
                let tls = acceptor
                    .accept(stream)
                    .await
                    .with_context(|| format!("TLS handshake with client {} failed", client_addr))?;
                ConnectionStream::tls(tls)
            }
            None => ConnectionStream::plain(stream),
        };

        self.active_clients.fetch_add(1, Ordering::Relaxed);
        let result = ClientSession::new(stream, client_addr, Arc::clone(&self.ctx))
            .run()
            .await;
        self.active_clients.fetch_sub(1, Ordering::Relaxed);

        result.with_context(|| format!("Session with client {} failed", client_addr))
    }

    /// Shared reservation counters, as shown on the status page
    #[must_use]
    #[inline]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.ctx.registry
    }

    #[must_use]
    #[inline]
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    #[must_use]
    #[inline]
    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    #[must_use]
    pub fn active_clients(&self) -> usize {
        self.active_clients.load(Ordering::Relaxed)
    }
}

/// Classify an error as a client disconnect (broken pipe/connection reset)
///
/// Such errors are a normal way for a session to end and are logged at
/// DEBUG rather than WARN.
///
/// # Examples
///
/// ```
/// use std::io::{Error, ErrorKind};
/// use nntp_auth_proxy::is_client_disconnect_error;
///
/// let broken_pipe = Error::from(ErrorKind::BrokenPipe);
/// let wrapped = anyhow::Error::from(broken_pipe);
/// assert!(is_client_disconnect_error(&wrapped));
///
/// let other_error = anyhow::anyhow!("some other error");
/// assert!(!is_client_disconnect_error(&other_error));
/// ```
pub fn is_client_disconnect_error(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io_err| {
            matches!(
                io_err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::UnexpectedEof
            )
        })
}
