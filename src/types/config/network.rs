//! Network-related configuration types

use std::num::NonZeroU16;
use std::str::FromStr;

use crate::types::ValidationError;

nonzero_newtype! {
    /// TCP port, never zero
    ///
    /// ```
    /// use nntp_auth_proxy::types::Port;
    ///
    /// let port = Port::new(119).unwrap();
    /// assert_eq!(port.get(), 119);
    /// assert!(Port::new(0).is_none());
    /// ```
    pub struct Port(NonZeroU16: u16 as "u16");
}

impl Port {
    /// NNTP port (119)
    pub const NNTP: Self = Self(NonZeroU16::new(119).unwrap());

    /// NNTPS port (563)
    pub const NNTPS: Self = Self(NonZeroU16::new(563).unwrap());

    /// Default status page port (8080)
    pub const STATUS: Self = Self(NonZeroU16::new(8080).unwrap());
}

impl Default for Port {
    fn default() -> Self {
        Self::NNTP
    }
}

impl FromStr for Port {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port = s
            .parse::<u16>()
            .map_err(|_| ValidationError::InvalidPortNumber(s.to_string()))?;
        Self::try_from(port)
    }
}
