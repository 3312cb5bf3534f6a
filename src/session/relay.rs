//! Bidirectional byte pump between client and backend
//!
//! Once a whitelisted command arrives on an authenticated session, the
//! proxy stops interpreting traffic: the triggering line goes to the
//! backend verbatim, then bytes are copied in both directions concurrently
//! until one side closes or fails. Whichever direction ends first ends the
//! relay.

use std::fmt;
use std::io::{self, ErrorKind};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::constants::buffer::RELAY;

/// Bytes moved in each direction during a relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferMetrics {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

impl TransferMetrics {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.client_to_backend + self.backend_to_client
    }
}

impl fmt::Display for TransferMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "↑{} ↓{}",
            format_bytes(self.client_to_backend),
            format_bytes(self.backend_to_client)
        )
    }
}

/// Why the relay stopped
#[derive(Debug)]
pub enum RelayEnd {
    /// Client sent EOF
    ClientClosed,
    /// Backend sent EOF
    BackendClosed,
    /// Read or write on the client failed
    ClientError(io::Error),
    /// Read or write on the backend failed
    BackendError(io::Error),
}

/// Forward `first_line`, then copy both ways until either side ends
///
/// Each direction is its own copy loop, so a peer that stops reading only
/// stalls the direction writing to it. The first loop to finish decides the
/// outcome and the other is dropped. Reading from `client` drains anything
/// it has buffered first, so bytes a client pipelined behind the triggering
/// command are not lost.
pub async fn relay<C, B>(
    client: &mut C,
    backend: &mut B,
    first_line: &[u8],
) -> (RelayEnd, TransferMetrics)
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let mut metrics = TransferMetrics::default();

    if let Err(e) = write_flush(backend, first_line).await {
        return (RelayEnd::BackendError(e), metrics);
    }
    metrics.client_to_backend += first_line.len() as u64;

    let (mut client_rd, mut client_wr) = tokio::io::split(client);
    let (mut backend_rd, mut backend_wr) = tokio::io::split(backend);
    let mut uploaded = 0u64;
    let mut downloaded = 0u64;

    let end = tokio::select! {
        copied = copy_one_way(&mut client_rd, &mut backend_wr, &mut uploaded) => match copied {
            Copied::Eof => RelayEnd::ClientClosed,
            Copied::ReadFailed(e) => RelayEnd::ClientError(e),
            Copied::WriteFailed(e) => RelayEnd::BackendError(e),
        },
        copied = copy_one_way(&mut backend_rd, &mut client_wr, &mut downloaded) => match copied {
            Copied::Eof => RelayEnd::BackendClosed,
            Copied::ReadFailed(e) => RelayEnd::BackendError(e),
            Copied::WriteFailed(e) => RelayEnd::ClientError(e),
        },
    };

    metrics.client_to_backend += uploaded;
    metrics.backend_to_client += downloaded;
    (end, metrics)
}

/// How a single copy direction stopped
enum Copied {
    Eof,
    ReadFailed(io::Error),
    WriteFailed(io::Error),
}

/// Copy `reader` into `writer` until EOF or an error, counting bytes
/// delivered into `moved`
async fn copy_one_way<R, W>(reader: &mut R, writer: &mut W, moved: &mut u64) -> Copied
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Copied::Eof,
            Ok(n) => n,
            Err(e) => return Copied::ReadFailed(e),
        };
        if let Err(e) = write_flush(writer, &buf[..n]).await {
            return Copied::WriteFailed(e);
        }
        *moved += n as u64;
    }
}

async fn write_flush<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await
}

/// Log the end of a relay with a level matching how it ended
pub fn log_relay_end(
    client_addr: impl fmt::Display,
    username: &str,
    backend: &str,
    end: &RelayEnd,
    metrics: TransferMetrics,
) {
    match end {
        RelayEnd::ClientClosed => debug!(
            "Client {} ({}) closed connection to {} | {}",
            client_addr, username, backend, metrics
        ),
        RelayEnd::BackendClosed => debug!(
            "Backend {} closed connection for client {} ({}) | {}",
            backend, client_addr, username, metrics
        ),
        RelayEnd::ClientError(e) if is_disconnect(e) => debug!(
            "Client {} ({}) disconnected: {} | {}",
            client_addr, username, e, metrics
        ),
        RelayEnd::ClientError(e) => warn!(
            "Error on client {} ({}): {} ({:?}) | {}",
            client_addr,
            username,
            e,
            e.kind(),
            metrics
        ),
        RelayEnd::BackendError(e) => warn!(
            "Error on backend {} for client {} ({}): {} | {}",
            backend, client_addr, username, e, metrics
        ),
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
    )
}

/// Format bytes in human-readable format (KB, MB, GB)
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
