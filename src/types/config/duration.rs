//! Duration serialization helpers for configuration files

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Helper for (de)serializing a `Duration` as whole seconds
///
/// Config files specify timeouts as plain integers, e.g.
/// `handshake_timeout = 30`.
pub mod duration_serde {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
