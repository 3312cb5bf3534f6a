//! Validated string types that enforce invariants at construction time

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for string types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("hostname cannot be empty or whitespace")]
    EmptyHostName,

    #[error("server name cannot be empty or whitespace")]
    EmptyServerName,

    #[error("username cannot be empty or contain whitespace")]
    InvalidUsername,

    #[error("{0} cannot be 0")]
    Zero(&'static str),

    #[error("invalid port number: {0}")]
    InvalidPortNumber(String),
}

/// Declare a string newtype whose constructor runs `$check` first.
///
/// The generated type serializes as a plain string and re-runs the check when
/// deserialized or parsed, so an invalid value never exists at runtime.
macro_rules! validated_string {
    ($(#[$meta:meta])* $vis:vis struct $name:ident checked by $check:path;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Validate `value` and wrap it as a ", stringify!($name))]
            pub fn new(value: String) -> Result<Self, ValidationError> {
                $check(&value).map(|()| Self(value))
            }

            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.to_owned())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Self::new(String::deserialize(deserializer)?).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn check_host(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::EmptyHostName);
    }
    Ok(())
}

fn check_server_name(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::EmptyServerName);
    }
    Ok(())
}

/// One `AUTHINFO USER` token: non-empty, no whitespace, case preserved.
fn check_username(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

validated_string! {
    /// Backend hostname or address
    ///
    /// ```
    /// use nntp_auth_proxy::types::HostName;
    ///
    /// let host: HostName = "news.example.com".parse().unwrap();
    /// assert_eq!(host.as_str(), "news.example.com");
    /// assert!("   ".parse::<HostName>().is_err());
    /// ```
    pub struct HostName checked by check_host;
}

validated_string! {
    /// Backend name; keys the connection registry and labels the status page
    pub struct ServerName checked by check_server_name;
}

validated_string! {
    /// Client username as configured and as sent in `AUTHINFO USER`
    ///
    /// ```
    /// use nntp_auth_proxy::types::Username;
    ///
    /// assert!(Username::new("alice".to_string()).is_ok());
    /// assert!(Username::new("al ice".to_string()).is_err());
    /// ```
    pub struct Username checked by check_username;
}
