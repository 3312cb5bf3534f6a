//! Connection error types for the NNTP proxy
//!
//! These cover everything that can go wrong between picking a backend and
//! handing the client a `281 Welcome`. None of the detail reaches the
//! client, which only ever sees `502 Backend AUTH Failed!`; it is for logs.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while connecting to and authenticating with a backend
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    /// TCP connection failed
    #[error("Failed to connect to {address}: {source}")]
    TcpConnect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Backend host is not usable as a TLS server name
    #[error("Invalid TLS server name '{0}'")]
    InvalidServerName(String),

    /// TLS handshake failed
    #[error("TLS handshake failed for backend '{backend}': {source}")]
    TlsHandshake {
        backend: String,
        #[source]
        source: io::Error,
    },

    /// Backend greeted with something other than 200
    #[error("Invalid greeting from backend '{backend}': {greeting}")]
    InvalidGreeting { backend: String, greeting: String },

    /// Backend answered an AUTHINFO step with the wrong code
    #[error("Unexpected response to {stage} from backend '{backend}': {response}")]
    UnexpectedResponse {
        backend: String,
        stage: &'static str,
        response: String,
    },

    /// Backend closed the connection mid-handshake
    #[error("Backend '{backend}' closed the connection during {stage}")]
    Closed {
        backend: String,
        stage: &'static str,
    },

    /// Connect plus AUTHINFO exchange took too long
    #[error("Backend '{backend}' did not complete the handshake within {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectionError {
    /// Check if this is an authentication rejection from the backend
    #[must_use]
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { .. })
    }

    /// Check if this is a network connectivity error
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::TcpConnect { .. } | Self::Timeout { .. } | Self::Closed { .. }
        )
    }

    /// Get the appropriate log level for this error
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        match self {
            // Credentials or config are wrong; needs an operator
            Self::UnexpectedResponse { .. }
            | Self::InvalidGreeting { .. }
            | Self::InvalidServerName(_)
            | Self::TlsHandshake { .. } => tracing::Level::ERROR,
            // Might be transient
            Self::TcpConnect { .. } | Self::Timeout { .. } | Self::Closed { .. } => {
                tracing::Level::WARN
            }
            Self::Io(e) if e.kind() == io::ErrorKind::BrokenPipe => tracing::Level::DEBUG,
            Self::Io(_) => tracing::Level::WARN,
        }
    }
}
