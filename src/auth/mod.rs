//! Authentication module
//!
//! Client credentials are checked locally against bcrypt hashes; backend
//! authentication is performed by the proxy with per-backend credentials
//! the client never sees.

mod backend;
mod credentials;

pub use backend::{BackendAuthenticator, BackendConnector};
pub use credentials::{CredentialStore, hash_password};
