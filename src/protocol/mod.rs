//! NNTP protocol handling module
//!
//! Status codes, the fixed client-facing response lines, and the small
//! amount of response parsing the backend handshake needs.

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub mod codes;
mod response;
mod responses;

pub use response::{is_response_code, parse_status_code, status_text};
pub use responses::*;

/// Send the proxy greeting to a newly accepted client
///
/// Uses the configured banner when present, otherwise the default
/// `200 Welcome to NNTP Proxy!`.
pub async fn send_proxy_greeting<W>(client: &mut W, banner: Option<&str>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match banner {
        Some(message) => client.write_all(greeting(message).as_bytes()).await?,
        None => client.write_all(PROXY_GREETING).await?,
    }
    client.flush().await
}
