//! Command-line arguments

use crate::config::FrontendConfig;
use crate::types::Port;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse port from command line argument
fn parse_port(s: &str) -> Result<Port, String> {
    s.parse::<Port>().map_err(|e| format!("Invalid port: {}", e))
}

/// NNTP reverse proxy with local user authentication
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (.toml, or .json for the legacy layout)
    #[arg(short, long, default_value = "config.toml", env = "NNTP_PROXY_CONFIG")]
    pub config: PathBuf,

    /// Host to bind to (overrides config file)
    #[arg(long, env = "NNTP_PROXY_HOST")]
    pub host: Option<String>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "NNTP_PROXY_PORT", value_parser = parse_port)]
    pub port: Option<Port>,

    /// Number of worker threads (default: 1, use 0 for CPU cores)
    #[arg(short, long, env = "NNTP_PROXY_THREADS")]
    pub threads: Option<usize>,

    /// Also write logs to this file
    #[arg(long, env = "NNTP_PROXY_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read a password from stdin and print its bcrypt hash for `users`
    HashPassword {
        /// bcrypt cost factor
        #[arg(long, default_value_t = crate::constants::hashing::DEFAULT_COST)]
        cost: u32,
    },
}

impl Args {
    /// Apply `--host`/`--port` on top of the configured frontend
    pub fn apply_overrides(&self, frontend: &mut FrontendConfig) {
        if let Some(host) = &self.host {
            frontend.host.clone_from(host);
        }
        if let Some(port) = self.port {
            frontend.port = port;
        }
    }
}
