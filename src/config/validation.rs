//! Configuration validation
//!
//! This module provides validation logic for the configuration to ensure
//! all settings are valid before the proxy starts.

use anyhow::Result;
use std::collections::HashSet;

use super::types::{Config, UserConfig};

/// Length of a modular-crypt bcrypt string (`$2b$NN$` + 22 salt + 31 hash)
const BCRYPT_HASH_LEN: usize = 60;

impl Config {
    /// Validate configuration for correctness
    ///
    /// Field-level constraints (non-zero ports and caps, non-empty names) are
    /// enforced by the types during deserialization. This checks the rest:
    /// - At least one backend configured
    /// - Backend names and usernames are unique
    /// - Frontend TLS certificate and key are set together
    /// - Every user's password hash looks like a bcrypt hash
    /// - The status page path is absolute
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration must have at least one backend"
            ));
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if !names.insert(backend.name.as_str()) {
                return Err(anyhow::anyhow!(
                    "Duplicate backend name '{}'",
                    backend.name
                ));
            }
            if !backend.tls_verify_cert && backend.use_tls {
                tracing::warn!(
                    "Backend '{}' has TLS certificate verification disabled",
                    backend.name
                );
            }
        }

        let mut usernames = HashSet::new();
        for user in &self.users {
            if !usernames.insert(user.username.as_str()) {
                return Err(anyhow::anyhow!("Duplicate user '{}'", user.username));
            }
            validate_user(user)?;
        }

        if self.frontend.tls_cert.is_some() != self.frontend.tls_key.is_some() {
            return Err(anyhow::anyhow!(
                "Frontend TLS requires both tls_cert and tls_key"
            ));
        }

        if self.status.enabled && !self.status.path.starts_with('/') {
            return Err(anyhow::anyhow!(
                "Status path '{}' must start with '/'",
                self.status.path
            ));
        }

        if self.frontend.allowed_commands.is_empty() {
            tracing::warn!(
                "No allowed commands configured; authenticated clients can only send AUTHINFO"
            );
        }
        if self.users.is_empty() {
            tracing::warn!("No users configured; every login will be rejected");
        }

        Ok(())
    }
}

/// Validate a single user entry
fn validate_user(user: &UserConfig) -> Result<()> {
    if !is_bcrypt_hash(&user.password_hash) {
        return Err(anyhow::anyhow!(
            "User '{}' has an invalid password_hash (expected a bcrypt hash)",
            user.username
        ));
    }
    Ok(())
}

/// Structural check for `$2[abxy]$<cost>$<53 chars>`
fn is_bcrypt_hash(hash: &str) -> bool {
    if hash.len() != BCRYPT_HASH_LEN {
        return false;
    }
    let mut parts = hash.split('$');
    let (Some(""), Some(version), Some(cost), Some(rest), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    matches!(version, "2a" | "2b" | "2x" | "2y")
        && cost.len() == 2
        && cost.parse::<u32>().is_ok_and(|c| (4..=31).contains(&c))
        && rest.len() == 53
        && rest
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'/')
}
