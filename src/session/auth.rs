//! Client authentication flow
//!
//! `AUTHINFO USER` → `381 Continue` → `AUTHINFO PASS`, then in order:
//! verify credentials, reserve a user slot, reserve a backend, run the
//! backend handshake. Each step that fails gives back whatever the earlier
//! steps reserved before the client sees the rejection.

use std::sync::Arc;
use thiserror::Error;
use tracing::{Level, debug, error, info, warn};

use super::state::AttachedBackend;
use super::SessionContext;
use crate::connection_error::ConnectionError;
use crate::protocol;

/// Client-visible reasons an authentication attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// Unknown user or wrong password (deliberately not distinguished)
    #[error("authentication failed")]
    InvalidCredentials,
    /// User already has `max_connections` sessions
    #[error("user connection limit reached")]
    TooManyConnections,
    /// Every backend is at capacity
    #[error("no backend with free capacity")]
    NoFreeBackend,
    /// Connecting to or authenticating with the chosen backend failed
    #[error("backend authentication failed")]
    BackendAuthFailed,
}

impl AuthFailure {
    /// The line sent to the client
    #[must_use]
    pub const fn response(&self) -> &'static [u8] {
        match self {
            Self::InvalidCredentials => protocol::AUTH_FAILED,
            Self::TooManyConnections => protocol::TOO_MANY_CONNECTIONS,
            Self::NoFreeBackend => protocol::NO_FREE_BACKEND,
            Self::BackendAuthFailed => protocol::BACKEND_AUTH_FAILED,
        }
    }
}

impl SessionContext {
    /// Run the post-password steps and return an attached backend
    ///
    /// Nothing stays reserved when this returns an error.
    pub async fn authenticate_and_attach(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AttachedBackend, AuthFailure> {
        if !self.verify_credentials(username, password).await {
            info!(username, "Authentication failed");
            return Err(AuthFailure::InvalidCredentials);
        }

        let Some(user) = self.registry.reserve_user(username) else {
            info!(username, "User at connection limit");
            return Err(AuthFailure::TooManyConnections);
        };

        let Some(backend) = self.selector.select_and_reserve() else {
            warn!(username, "No free backend connection");
            return Err(AuthFailure::NoFreeBackend);
        };

        match self.connector.connect_and_authenticate(backend.config()).await {
            Ok(stream) => Ok(AttachedBackend {
                stream,
                backend,
                user,
            }),
            Err(e) => {
                log_backend_failure(backend.name(), username, &e);
                Err(AuthFailure::BackendAuthFailed)
            }
        }
    }

    /// bcrypt off the async workers
    async fn verify_credentials(&self, username: &str, password: &str) -> bool {
        let credentials = Arc::clone(&self.credentials);
        let (username, password) = (username.to_string(), password.to_string());
        tokio::task::spawn_blocking(move || credentials.verify(&username, &password))
            .await
            .unwrap_or_else(|e| {
                error!("Credential check task failed: {}", e);
                false
            })
    }
}

fn log_backend_failure(backend: &str, username: &str, e: &ConnectionError) {
    let level = e.log_level();
    if level == Level::ERROR {
        error!(backend, username, "Backend handshake failed: {}", e);
    } else if level == Level::WARN {
        warn!(backend, username, "Backend handshake failed: {}", e);
    } else {
        debug!(backend, username, "Backend handshake failed: {}", e);
    }
}
