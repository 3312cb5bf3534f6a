//! Constants used throughout the NNTP proxy
//!
//! This module centralizes magic numbers so they are not scattered through
//! the session and listener code.

/// Buffer size constants
pub mod buffer {
    /// BufReader capacity for client command parsing (8KB)
    pub const READER_CAPACITY: usize = 8 * 1024;

    /// Longest client command line accepted before relay mode (4KB)
    ///
    /// RFC 3977 allows 512 octets; the slack tolerates sloppy clients
    /// while still bounding memory per connection.
    pub const COMMAND_MAX: usize = 4096;

    /// Per-direction copy buffer once a session is relaying (64KB)
    pub const RELAY: usize = 64 * 1024;
}

/// User-related constants
pub mod user {
    /// Placeholder for logs before a client has authenticated
    pub const ANONYMOUS: &str = "<anonymous>";
}

/// bcrypt parameters
pub mod hashing {
    /// Cost used by the `hash-password` subcommand
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;
    /// Lowest cost bcrypt accepts
    pub const MIN_COST: u32 = 4;
}
