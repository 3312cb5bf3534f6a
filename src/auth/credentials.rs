//! Client credential store
//!
//! Passwords are kept only as bcrypt hashes. Lookups are exact and
//! case-sensitive; an unknown user and a wrong password produce the same
//! answer and take roughly the same time.

use crate::config::UserConfig;
use std::collections::HashMap;
use tracing::warn;

/// Username → bcrypt hash, read-only after load
///
/// Connection caps are enforced by the registry, not here.
#[derive(Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
    /// Burned on unknown usernames so they cost as much as a wrong password
    dummy_hash: Option<String>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("user_count", &self.users.len())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Build the store from configured users
    pub fn from_users(users: &[UserConfig]) -> Self {
        let users: HashMap<String, String> = users
            .iter()
            .map(|user| (user.username.as_str().to_string(), user.password_hash.clone()))
            .collect();

        let cost = users
            .values()
            .find_map(|hash| hash_cost(hash))
            .unwrap_or(bcrypt::DEFAULT_COST);
        let dummy_hash = match bcrypt::hash("", cost) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!("Could not prepare dummy password hash: {}", e);
                None
            }
        };

        Self { users, dummy_hash }
    }

    /// Check a username/password pair
    ///
    /// This runs bcrypt and blocks for its duration; call it off the async
    /// executor.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            None => {
                if let Some(dummy) = &self.dummy_hash {
                    let _ = bcrypt::verify(password, dummy);
                }
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Produce a bcrypt hash suitable for a `password_hash` config entry
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Cost factor of a `$2b$NN$...` hash
fn hash_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}
