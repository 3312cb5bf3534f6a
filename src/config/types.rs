//! Configuration type definitions
//!
//! This module contains all the core configuration structures used by the proxy.

use crate::types::{HostName, MaxConnections, Port, ServerName, Username, duration_serde};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk configuration format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.json` files are parsed as JSON, everything else as TOML
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Main proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Client-facing listener settings
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// Plain-text status page settings
    #[serde(default)]
    pub status: StatusConfig,
    /// Backend NNTP servers, in selection order
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    /// Users allowed to authenticate against the proxy
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Client-facing listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontendConfig {
    /// Host/IP to bind to (default: 0.0.0.0)
    #[serde(default = "super::defaults::frontend_host")]
    pub host: String,
    /// Port to listen on (default: 119)
    #[serde(default = "super::defaults::frontend_port")]
    pub port: Port,
    /// PEM certificate chain; TLS is enabled when both cert and key are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<PathBuf>,
    /// PEM private key matching `tls_cert`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<PathBuf>,
    /// Commands a client may send once authenticated (case-insensitive)
    #[serde(default = "super::defaults::allowed_commands")]
    pub allowed_commands: Vec<String>,
    /// Upper bound on connecting to and authenticating with a backend, in seconds
    #[serde(
        with = "duration_serde",
        default = "super::defaults::handshake_timeout"
    )]
    pub handshake_timeout: Duration,
    /// Banner sent to clients on connect, without the `200 ` status code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
}

impl FrontendConfig {
    /// Address the client listener binds to
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether inbound connections are TLS-terminated
    #[must_use]
    pub fn tls_enabled(&self) -> bool {
        self.tls_cert.is_some() && self.tls_key.is_some()
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            host: super::defaults::frontend_host(),
            port: super::defaults::frontend_port(),
            tls_cert: None,
            tls_key: None,
            allowed_commands: super::defaults::allowed_commands(),
            handshake_timeout: super::defaults::handshake_timeout(),
            greeting: None,
        }
    }
}

/// Status page settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusConfig {
    #[serde(default = "super::defaults::status_enabled")]
    pub enabled: bool,
    #[serde(default = "super::defaults::status_host")]
    pub host: String,
    #[serde(default = "super::defaults::status_port")]
    pub port: Port,
    /// Request path serving the backend table
    #[serde(default = "super::defaults::status_path")]
    pub path: String,
}

impl StatusConfig {
    /// Address the status listener binds to
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: super::defaults::status_enabled(),
            host: super::defaults::status_host(),
            port: super::defaults::status_port(),
            path: super::defaults::status_path(),
        }
    }
}

/// Configuration for a single backend server
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub name: ServerName,
    pub host: HostName,
    #[serde(default)]
    pub port: Port,
    /// Enable TLS/SSL for this backend connection
    #[serde(default)]
    pub use_tls: bool,
    /// Verify TLS certificates (recommended for production)
    #[serde(default = "super::defaults::tls_verify_cert")]
    pub tls_verify_cert: bool,
    /// Username the proxy sends in `AUTHINFO USER`
    pub username: String,
    /// Password the proxy sends in `AUTHINFO PASS`
    pub password: String,
    /// Maximum number of concurrent sessions relayed to this server
    #[serde(default = "super::defaults::backend_max_connections")]
    pub max_connections: MaxConnections,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("tls_verify_cert", &self.tls_verify_cert)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl BackendConfig {
    /// Create a builder for constructing a BackendConfig
    ///
    /// # Examples
    ///
    /// ```
    /// use nntp_auth_proxy::config::BackendConfig;
    ///
    /// let backend = BackendConfig::builder("news.example.com", 563)
    ///     .name("primary")
    ///     .credentials("proxyuser", "secret")
    ///     .use_tls(true)
    ///     .max_connections(20)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(backend.address(), "news.example.com:563");
    /// ```
    #[must_use]
    pub fn builder(host: impl Into<String>, port: u16) -> BackendConfigBuilder {
        BackendConfigBuilder::new(host, port)
    }

    /// `host:port` string used to open the transport
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for constructing `BackendConfig` instances
pub struct BackendConfigBuilder {
    host: String,
    port: u16,
    name: Option<String>,
    username: String,
    password: String,
    max_connections: Option<usize>,
    use_tls: bool,
    tls_verify_cert: bool,
}

impl BackendConfigBuilder {
    /// Create a new builder with required parameters
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            name: None,
            username: String::new(),
            password: String::new(),
            max_connections: None,
            use_tls: false,
            tls_verify_cert: true,
        }
    }

    /// Set the backend name (defaults to "host:port")
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the credentials sent to the backend
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    #[must_use]
    pub fn use_tls(mut self, enabled: bool) -> Self {
        self.use_tls = enabled;
        self
    }

    #[must_use]
    pub fn tls_verify_cert(mut self, verify: bool) -> Self {
        self.tls_verify_cert = verify;
        self
    }

    /// Build the BackendConfig
    ///
    /// # Errors
    ///
    /// Returns an error if the host or name is empty, the port is 0, or
    /// max connections is explicitly set to 0.
    pub fn build(self) -> Result<BackendConfig, anyhow::Error> {
        let host = HostName::new(self.host.clone())?;

        let port = Port::new(self.port)
            .ok_or_else(|| anyhow::anyhow!("Invalid port: {} (must be 1-65535)", self.port))?;

        let name_str = self
            .name
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port));
        let name = ServerName::new(name_str)?;

        let max_connections = match self.max_connections {
            Some(max) => MaxConnections::new(max)
                .ok_or_else(|| anyhow::anyhow!("Invalid max_connections: {} (must be > 0)", max))?,
            None => super::defaults::backend_max_connections(),
        };

        Ok(BackendConfig {
            name,
            host,
            port,
            use_tls: self.use_tls,
            tls_verify_cert: self.tls_verify_cert,
            username: self.username,
            password: self.password,
            max_connections,
        })
    }
}

/// A user allowed to authenticate against the proxy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    pub username: Username,
    /// bcrypt hash of the user's password
    pub password_hash: String,
    /// Maximum number of concurrent authenticated sessions
    #[serde(default = "super::defaults::user_max_connections")]
    pub max_connections: MaxConnections,
}

impl UserConfig {
    /// Build a user entry from an already-computed hash
    ///
    /// # Errors
    /// Returns an error if the username is invalid or `max_connections` is 0.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        max_connections: usize,
    ) -> Result<Self, anyhow::Error> {
        Ok(Self {
            username: Username::new(username.into())?,
            password_hash: password_hash.into(),
            max_connections: MaxConnections::new(max_connections).ok_or_else(|| {
                anyhow::anyhow!("Invalid max_connections: {} (must be > 0)", max_connections)
            })?,
        })
    }
}
