//! The older PascalCase JSON layout
//!
//! Deployments still carry `config.json` files shaped like
//! `{"Frontend": {...}, "Backend": [...], "Users": [...]}` with ports written
//! as strings. They are read into [`LegacyConfig`] and converted, so a `.json`
//! file in either layout loads.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::PathBuf;

use super::types::{BackendConfig, Config, FrontendConfig, StatusConfig, UserConfig};
use crate::types::Port;

/// Top-level keys that only appear in the older layout
const LEGACY_KEYS: [&str; 3] = ["Frontend", "Backend", "Users"];

/// Whether a parsed JSON document uses the older layout
pub(super) fn is_legacy_layout(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .is_some_and(|doc| LEGACY_KEYS.iter().any(|key| doc.contains_key(*key)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyConfig {
    #[serde(default)]
    pub frontend: LegacyFrontend,
    #[serde(default)]
    pub backend: Vec<LegacyBackend>,
    #[serde(default)]
    pub users: Vec<LegacyUser>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyFrontend {
    #[serde(rename = "FrontendAddr", default)]
    pub addr: Option<String>,
    #[serde(rename = "FrontendPort", default)]
    pub port: Option<LegacyPort>,
    #[serde(rename = "FrontendTLS", default)]
    pub tls: bool,
    #[serde(rename = "FrontendTLSCert", default)]
    pub tls_cert: Option<PathBuf>,
    #[serde(rename = "FrontendTLSKey", default)]
    pub tls_key: Option<PathBuf>,
    #[serde(rename = "FrontendHTTPAddr", default)]
    pub http_addr: Option<String>,
    #[serde(rename = "FrontendHTTPPort", default)]
    pub http_port: Option<LegacyPort>,
    #[serde(rename = "FrontendAllowedCommands", default)]
    pub allowed_commands: Vec<LegacyCommand>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyCommand {
    #[serde(rename = "FrontendCommand")]
    pub command: String,
}

#[derive(Debug, Deserialize)]
pub struct LegacyBackend {
    #[serde(rename = "BackendName")]
    pub name: String,
    #[serde(rename = "BackendAddr")]
    pub addr: String,
    #[serde(rename = "BackendPort")]
    pub port: LegacyPort,
    #[serde(rename = "BackendTLS", default)]
    pub tls: bool,
    #[serde(rename = "BackendUser")]
    pub user: String,
    #[serde(rename = "BackendPass")]
    pub pass: String,
    #[serde(rename = "BackendConns")]
    pub conns: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyUser {
    pub username: String,
    /// bcrypt hash
    pub password: String,
    pub max_connections: usize,
}

/// Ports were strings in the older files; plain numbers are accepted too
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegacyPort {
    Text(String),
    Number(u16),
}

impl LegacyPort {
    fn to_port(&self) -> Result<Port> {
        match self {
            Self::Text(text) => text
                .trim()
                .parse::<Port>()
                .with_context(|| format!("Invalid port '{text}'")),
            Self::Number(n) => Port::try_from(*n).map_err(Into::into),
        }
    }
}

impl TryFrom<LegacyConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(legacy: LegacyConfig) -> Result<Self> {
        let fe = legacy.frontend;

        let mut frontend = FrontendConfig::default();
        if let Some(addr) = fe.addr.filter(|a| !a.trim().is_empty()) {
            frontend.host = addr;
        }
        if let Some(port) = &fe.port {
            frontend.port = port.to_port().context("Frontend.FrontendPort")?;
        }
        if fe.tls {
            if fe.tls_cert.is_none() || fe.tls_key.is_none() {
                bail!("Frontend.FrontendTLS is set but FrontendTLSCert or FrontendTLSKey is missing");
            }
            frontend.tls_cert = fe.tls_cert;
            frontend.tls_key = fe.tls_key;
        }
        if !fe.allowed_commands.is_empty() {
            frontend.allowed_commands = fe.allowed_commands.into_iter().map(|c| c.command).collect();
        }

        // The older proxy always served the status page
        let mut status = StatusConfig::default();
        if let Some(addr) = fe.http_addr.filter(|a| !a.trim().is_empty()) {
            status.host = addr;
        }
        if let Some(port) = &fe.http_port {
            status.port = port.to_port().context("Frontend.FrontendHTTPPort")?;
        }

        let backends = legacy
            .backend
            .into_iter()
            .map(|b| {
                let port = b.port.to_port().with_context(|| format!("Backend '{}'", b.name))?;
                BackendConfig::builder(b.addr, port.get())
                    .name(b.name.clone())
                    .credentials(b.user, b.pass)
                    .use_tls(b.tls)
                    // Backend certificates were never checked by the older proxy
                    .tls_verify_cert(false)
                    .max_connections(b.conns)
                    .build()
                    .with_context(|| format!("Backend '{}'", b.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let users = legacy
            .users
            .into_iter()
            .map(|u| {
                let name = u.username.clone();
                UserConfig::new(u.username, u.password, u.max_connections)
                    .with_context(|| format!("User '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            frontend,
            status,
            backends,
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{
        "Frontend": {
            "FrontendAddr": "0.0.0.0",
            "FrontendPort": "1119",
            "FrontendTLS": false,
            "FrontendHTTPAddr": "127.0.0.1",
            "FrontendHTTPPort": "8081",
            "FrontendAllowedCommands": [
                {"FrontendCommand": "ARTICLE"},
                {"FrontendCommand": "group"}
            ]
        },
        "Backend": [
            {"BackendName": "eweka", "BackendAddr": "news.eweka.nl", "BackendPort": "563",
             "BackendTLS": true, "BackendUser": "u1", "BackendPass": "p1", "BackendConns": 20},
            {"BackendName": "local", "BackendAddr": "10.0.0.5", "BackendPort": "119",
             "BackendTLS": false, "BackendUser": "u2", "BackendPass": "p2", "BackendConns": 4}
        ],
        "Users": [
            {"Username": "alice", "Password": "$2a$10$abcdefghijklmnopqrstuu5Q7aXxUd9mYk1LvP9aQ7XxVnT6o8nGm", "MaxConnections": 3}
        ]
    }"#;

    #[test]
    fn test_detects_layout() {
        let legacy: serde_json::Value = serde_json::from_str(LEGACY).unwrap();
        assert!(is_legacy_layout(&legacy));

        let native: serde_json::Value = serde_json::from_str(r#"{"backends": []}"#).unwrap();
        assert!(!is_legacy_layout(&native));
    }

    #[test]
    fn test_converts_all_sections() {
        let legacy: LegacyConfig = serde_json::from_str(LEGACY).unwrap();
        let config = Config::try_from(legacy).unwrap();

        assert_eq!(config.frontend.host, "0.0.0.0");
        assert_eq!(config.frontend.port.get(), 1119);
        assert!(!config.frontend.tls_enabled());
        assert_eq!(config.frontend.allowed_commands, vec!["ARTICLE", "group"]);

        assert!(config.status.enabled);
        assert_eq!(config.status.listen_addr(), "127.0.0.1:8081");
        assert_eq!(config.status.path, "/backendStatus");

        assert_eq!(config.backends.len(), 2);
        let eweka = &config.backends[0];
        assert_eq!(eweka.name.as_str(), "eweka");
        assert_eq!(eweka.address(), "news.eweka.nl:563");
        assert!(eweka.use_tls);
        assert!(!eweka.tls_verify_cert);
        assert_eq!(eweka.username, "u1");
        assert_eq!(eweka.password, "p1");
        assert_eq!(eweka.max_connections.get(), 20);
        assert!(!config.backends[1].use_tls);

        assert_eq!(config.users.len(), 1);
        assert_eq!(config.users[0].username.as_str(), "alice");
        assert_eq!(config.users[0].max_connections.get(), 3);
    }

    #[test]
    fn test_numeric_ports_accepted() {
        let json = r#"{"Backend": [{"BackendName": "a", "BackendAddr": "h", "BackendPort": 119,
            "BackendUser": "u", "BackendPass": "p", "BackendConns": 1}]}"#;
        let config = Config::try_from(serde_json::from_str::<LegacyConfig>(json).unwrap()).unwrap();
        assert_eq!(config.backends[0].port.get(), 119);
    }

    #[test]
    fn test_zero_connections_rejected() {
        let json = r#"{"Backend": [{"BackendName": "a", "BackendAddr": "h", "BackendPort": "119",
            "BackendUser": "u", "BackendPass": "p", "BackendConns": 0}]}"#;
        let err = Config::try_from(serde_json::from_str::<LegacyConfig>(json).unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("Backend 'a'"));
    }

    #[test]
    fn test_frontend_tls_needs_cert_and_key() {
        let json = r#"{"Frontend": {"FrontendTLS": true, "FrontendTLSCert": "/c.pem"}}"#;
        let result = Config::try_from(serde_json::from_str::<LegacyConfig>(json).unwrap());
        assert!(result.is_err());
    }
}
