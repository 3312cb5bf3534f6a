//! Default values for configuration fields
//!
//! This module centralizes all default value functions used in serde deserialization.

use crate::types::{MaxConnections, Port};
use std::time::Duration;

/// Default frontend bind host (all interfaces)
#[inline]
pub fn frontend_host() -> String {
    "0.0.0.0".to_string()
}

/// Default frontend port
#[inline]
pub fn frontend_port() -> Port {
    Port::NNTP
}

/// Default status page bind host (loopback only)
#[inline]
pub fn status_host() -> String {
    "127.0.0.1".to_string()
}

/// Default status page port
#[inline]
pub fn status_port() -> Port {
    Port::STATUS
}

/// Default status page path
#[inline]
pub fn status_path() -> String {
    "/backendStatus".to_string()
}

/// Status page is served unless explicitly disabled
#[inline]
pub fn status_enabled() -> bool {
    true
}

/// Default upper bound on the whole backend AUTHINFO exchange
#[inline]
pub fn handshake_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Default for TLS certificate verification (true for security)
#[inline]
pub fn tls_verify_cert() -> bool {
    true
}

/// Default maximum connections per backend
#[inline]
pub fn backend_max_connections() -> MaxConnections {
    MaxConnections::DEFAULT
}

/// Default maximum connections per user
#[inline]
pub fn user_max_connections() -> MaxConnections {
    MaxConnections::DEFAULT_PER_USER
}

/// Commands relayed when the config does not list any
///
/// Reader commands only; posting and transit commands must be enabled
/// explicitly.
#[must_use]
pub fn allowed_commands() -> Vec<String> {
    [
        "ARTICLE",
        "BODY",
        "STAT",
        "GROUP",
        "LISTGROUP",
        "LIST",
        "OVER",
        "XOVER",
        "DATE",
        "CAPABILITIES",
        "MODE",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
