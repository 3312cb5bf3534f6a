//! Connection limit configuration types

use std::num::NonZeroUsize;

nonzero_newtype! {
    /// Connection cap for a backend or a user
    ///
    /// ```
    /// use nntp_auth_proxy::types::MaxConnections;
    ///
    /// let max = MaxConnections::new(10).unwrap();
    /// assert_eq!(max.get(), 10);
    /// assert!(MaxConnections::new(0).is_none());
    /// ```
    pub struct MaxConnections(NonZeroUsize: usize as "usize");
}

impl MaxConnections {
    /// Default maximum connections per backend
    pub const DEFAULT: Self = Self(NonZeroUsize::new(10).unwrap());

    /// Default maximum connections per user
    pub const DEFAULT_PER_USER: Self = Self(NonZeroUsize::new(1).unwrap());
}

impl Default for MaxConnections {
    fn default() -> Self {
        Self::DEFAULT
    }
}
