//! Backend server authentication
//!
//! Opens the transport to a selected backend and drives the AUTHINFO
//! exchange on the client's behalf:
//!
//! ```text
//! backend: 200 greeting
//! proxy:   AUTHINFO USER <remote user>   backend: 381
//! proxy:   AUTHINFO PASS <remote pass>   backend: 281
//! ```
//!
//! Any other code, a closed connection, or the handshake timeout is a
//! failure. There is no retry and no failover to another backend.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::BackendConfig;
use crate::connection_error::ConnectionError;
use crate::protocol::{codes, parse_status_code, status_text};
use crate::stream::{AsyncStream, ConnectionStream};
use crate::tls::TlsManager;

/// Longest status line accepted from a backend (RFC 3977 §3.1)
const MAX_STATUS_LINE: usize = 512;

const STAGE_GREETING: &str = "greeting";
const STAGE_USER: &str = "AUTHINFO USER";
const STAGE_PASS: &str = "AUTHINFO PASS";

/// Handles authentication to backend NNTP servers
pub struct BackendAuthenticator;

impl BackendAuthenticator {
    /// Run greeting + AUTHINFO USER/PASS on an open stream
    ///
    /// Reads exactly the three status lines and nothing more, so the stream
    /// is positioned at the start of the relayed session on success.
    pub async fn authenticate<S>(stream: &mut S, backend: &BackendConfig) -> Result<(), ConnectionError>
    where
        S: AsyncStream,
    {
        let name = backend.name.as_str();

        let greeting = read_status_line(stream, name, STAGE_GREETING).await?;
        debug!(backend = name, "Backend greeting: {}", status_text(&greeting));
        if parse_status_code(&greeting) != Some(codes::POSTING_ALLOWED) {
            return Err(ConnectionError::InvalidGreeting {
                backend: name.to_string(),
                greeting: status_text(&greeting),
            });
        }

        let user_command = format!("AUTHINFO USER {}\r\n", backend.username);
        stream.write_all(user_command.as_bytes()).await?;
        stream.flush().await?;
        expect_code(stream, name, STAGE_USER, codes::PASSWORD_REQUIRED).await?;

        let pass_command = format!("AUTHINFO PASS {}\r\n", backend.password);
        stream.write_all(pass_command.as_bytes()).await?;
        stream.flush().await?;
        expect_code(stream, name, STAGE_PASS, codes::AUTH_ACCEPTED).await?;

        debug!(backend = name, "Backend authentication succeeded");
        Ok(())
    }
}

async fn expect_code<S>(
    stream: &mut S,
    backend: &str,
    stage: &'static str,
    expected: u16,
) -> Result<(), ConnectionError>
where
    S: AsyncStream,
{
    let line = read_status_line(stream, backend, stage).await?;
    debug!(backend, "{} response: {}", stage, status_text(&line));
    if parse_status_code(&line) == Some(expected) {
        Ok(())
    } else {
        Err(ConnectionError::UnexpectedResponse {
            backend: backend.to_string(),
            stage,
            response: status_text(&line),
        })
    }
}

/// Read a single LF-terminated line without reading past it
async fn read_status_line<S>(
    stream: &mut S,
    backend: &str,
    stage: &'static str,
) -> Result<Vec<u8>, ConnectionError>
where
    S: AsyncStream,
{
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        if stream.read(&mut byte).await? == 0 {
            return Err(ConnectionError::Closed {
                backend: backend.to_string(),
                stage,
            });
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            return Ok(line);
        }
        if line.len() >= MAX_STATUS_LINE {
            return Err(ConnectionError::UnexpectedResponse {
                backend: backend.to_string(),
                stage,
                response: format!("status line longer than {} bytes", MAX_STATUS_LINE),
            });
        }
    }
}

/// Opens and authenticates backend connections
///
/// Holds the TLS connectors so certificate stores are loaded once at
/// startup rather than per connection.
#[derive(Debug, Clone)]
pub struct BackendConnector {
    verified_tls: Option<TlsManager>,
    insecure_tls: Option<TlsManager>,
    handshake_timeout: Duration,
}

impl BackendConnector {
    /// Prepare TLS connectors for whichever verification modes `backends` use
    pub fn new(backends: &[BackendConfig], handshake_timeout: Duration) -> anyhow::Result<Self> {
        let needs = |verify: bool| {
            backends
                .iter()
                .any(|b| b.use_tls && b.tls_verify_cert == verify)
        };
        Ok(Self {
            verified_tls: needs(true).then(|| TlsManager::new(true)).transpose()?,
            insecure_tls: needs(false).then(|| TlsManager::new(false)).transpose()?,
            handshake_timeout,
        })
    }

    /// Open the transport to `backend`, TLS if configured
    pub async fn connect(&self, backend: &BackendConfig) -> Result<ConnectionStream, ConnectionError> {
        let address = backend.address();
        let tcp = TcpStream::connect(&address)
            .await
            .map_err(|source| ConnectionError::TcpConnect {
                address: address.clone(),
                source,
            })?;
        let _ = tcp.set_nodelay(true);

        if !backend.use_tls {
            return Ok(ConnectionStream::plain(tcp));
        }

        let manager = match (backend.tls_verify_cert, &self.verified_tls, &self.insecure_tls) {
            (true, Some(manager), _) | (false, _, Some(manager)) => manager.clone(),
            (verify, _, _) => TlsManager::new(verify).map_err(|e| ConnectionError::TlsHandshake {
                backend: backend.name.to_string(),
                source: std::io::Error::other(e),
            })?,
        };
        let tls = manager
            .handshake(tcp, backend.host.as_str(), backend.name.as_str())
            .await?;
        Ok(ConnectionStream::tls(tls))
    }

    /// Connect and authenticate, bounded by the handshake timeout
    ///
    /// On any failure the partially opened transport is dropped (closed)
    /// before returning.
    pub async fn connect_and_authenticate(
        &self,
        backend: &BackendConfig,
    ) -> Result<ConnectionStream, ConnectionError> {
        let attempt = async {
            let mut stream = self.connect(backend).await?;
            BackendAuthenticator::authenticate(&mut stream, backend).await?;
            Ok(stream)
        };

        tokio::time::timeout(self.handshake_timeout, attempt)
            .await
            .map_err(|_| ConnectionError::Timeout {
                backend: backend.name.to_string(),
                timeout: self.handshake_timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader, duplex};
    use tokio::net::TcpListener;

    fn backend() -> BackendConfig {
        BackendConfig::builder("127.0.0.1", 119)
            .name("mock")
            .credentials("remote-user", "remote-pass")
            .build()
            .unwrap()
    }

    /// Scripted backend: sends `greeting`, then answers each command line
    /// with the next reply, recording what it received
    async fn scripted(
        server: tokio::io::DuplexStream,
        greeting: &'static str,
        replies: Vec<&'static str>,
    ) -> Vec<String> {
        let (read, mut write) = tokio::io::split(server);
        let mut reader = BufReader::new(read);
        write.write_all(greeting.as_bytes()).await.unwrap();

        let mut received = Vec::new();
        for reply in replies {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            received.push(line.trim_end().to_string());
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        received
    }

    #[tokio::test]
    async fn test_successful_handshake() {
        let (mut client, server) = duplex(1024);
        let mock = tokio::spawn(scripted(
            server,
            "200 ready\r\n",
            vec!["381 more\r\n", "281 ok\r\n"],
        ));

        BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap();
        let received = mock.await.unwrap();
        assert_eq!(
            received,
            ["AUTHINFO USER remote-user", "AUTHINFO PASS remote-pass"]
        );
    }

    #[tokio::test]
    async fn test_bad_greeting() {
        let (mut client, server) = duplex(1024);
        tokio::spawn(scripted(server, "201 no posting\r\n", vec![]));

        let err = BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidGreeting { .. }));
    }

    #[tokio::test]
    async fn test_user_rejected() {
        let (mut client, server) = duplex(1024);
        tokio::spawn(scripted(server, "200 ready\r\n", vec!["482 no\r\n"]));

        let err = BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::UnexpectedResponse { stage: STAGE_USER, .. }
        ));
    }

    #[tokio::test]
    async fn test_password_rejected() {
        let (mut client, server) = duplex(1024);
        tokio::spawn(scripted(
            server,
            "200 ready\r\n",
            vec!["381 more\r\n", "481 bad password\r\n"],
        ));

        let err = BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap_err();
        match err {
            ConnectionError::UnexpectedResponse { stage, response, .. } => {
                assert_eq!(stage, STAGE_PASS);
                assert_eq!(response, "481 bad password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backend_closes_mid_handshake() {
        let (mut client, server) = duplex(1024);
        tokio::spawn(async move {
            let mut server = server;
            server.write_all(b"200 ready\r\n").await.unwrap();
            drop(server);
        });

        let err = BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Closed { .. } | ConnectionError::Io(_)));
    }

    #[tokio::test]
    async fn test_does_not_consume_past_final_line() {
        let (mut client, server) = duplex(1024);
        tokio::spawn(scripted(
            server,
            "200 ready\r\n",
            vec!["381 more\r\n", "281 ok\r\nEXTRA"],
        ));

        BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap();
        let mut rest = [0u8; 5];
        client.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"EXTRA");
    }

    #[tokio::test]
    async fn test_overlong_status_line() {
        let (mut client, server) = duplex(4096);
        tokio::spawn(async move {
            let mut server = server;
            server.write_all(&[b'2'; 600]).await.unwrap();
            // Keep the pipe open until the reader gives up
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let err = BackendAuthenticator::authenticate(&mut client, &backend())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let backend = BackendConfig::builder("127.0.0.1", port)
            .name("gone")
            .build()
            .unwrap();
        let connector = BackendConnector::new(&[backend.clone()], Duration::from_secs(5)).unwrap();
        let err = connector.connect_and_authenticate(&backend).await.unwrap_err();
        assert!(matches!(err, ConnectionError::TcpConnect { .. }));
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        // Accepts but never greets
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let backend = BackendConfig::builder("127.0.0.1", port)
            .name("silent")
            .build()
            .unwrap();
        let connector =
            BackendConnector::new(&[backend.clone()], Duration::from_millis(200)).unwrap();
        let err = connector.connect_and_authenticate(&backend).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Timeout { .. }));
    }

    #[test]
    fn test_connector_builds_only_needed_tls() {
        let plain = backend();
        let connector = BackendConnector::new(&[plain], Duration::from_secs(1)).unwrap();
        assert!(connector.verified_tls.is_none());
        assert!(connector.insecure_tls.is_none());

        let insecure = BackendConfig::builder("news.example.com", 563)
            .use_tls(true)
            .tls_verify_cert(false)
            .build()
            .unwrap();
        let connector = BackendConnector::new(&[insecure], Duration::from_secs(1)).unwrap();
        assert!(connector.verified_tls.is_none());
        assert!(connector.insecure_tls.is_some());
    }
}
