//! # NNTP authenticating reverse proxy
//!
//! Clients authenticate against locally configured users. The proxy then
//! claims a slot on the first backend with free capacity, logs in there
//! with the backend's own credentials, and relays bytes verbatim until
//! either side disconnects.
//!
//! Two kinds of limits hold at all times:
//! - a user never has more authenticated sessions than their `max_connections`
//! - a backend never carries more sessions than its `max_connections`
//!
//! Both are tracked by [`ConnectionRegistry`] and released when a session
//! ends, however it ends.

pub mod args;
pub mod auth;
pub mod command;
pub mod config;
pub mod connection_error;
pub mod constants;
pub mod logging;
pub mod protocol;
pub mod proxy;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod session;
pub mod status;
pub mod stream;
pub mod tls;
pub mod types;

pub use auth::{BackendConnector, CredentialStore, hash_password};
pub use config::{
    BackendConfig, Config, FrontendConfig, StatusConfig, UserConfig, create_default_config,
    load_config, write_config,
};
pub use connection_error::ConnectionError;
pub use proxy::{NntpProxy, is_client_disconnect_error};
pub use registry::ConnectionRegistry;
pub use router::BackendSelector;
pub use session::{AuthFailure, ClientSession, SessionContext};
pub use stream::{AsyncStream, ConnectionStream};
