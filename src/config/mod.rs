//! Configuration module
//!
//! This module handles all configuration types and loading
//! for the NNTP proxy server.

mod defaults;
mod legacy;
mod loading;
mod types;
mod validation;

pub use loading::{create_default_config, load_config, parse_config, write_config};
pub use types::{
    BackendConfig, BackendConfigBuilder, Config, ConfigFormat, FrontendConfig, StatusConfig,
    UserConfig,
};

pub use defaults::{allowed_commands, handshake_timeout, tls_verify_cert};
