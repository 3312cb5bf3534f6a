//! Validated configuration and identity types
//!
//! Values that would otherwise be bare strings and integers are wrapped in
//! newtypes that enforce their invariants at construction time, so the rest
//! of the proxy can rely on them being well-formed.

pub mod config;
pub mod validated;

pub use config::{MaxConnections, Port, duration_serde};
pub use validated::{HostName, ServerName, Username, ValidationError};
