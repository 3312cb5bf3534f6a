//! NNTP status codes used by the proxy (RFC 3977, RFC 4643)

/// Server ready, posting allowed (RFC 3977 §5.1.1)
pub const POSTING_ALLOWED: u16 = 200;
/// Authentication accepted (RFC 4643 §2.3)
pub const AUTH_ACCEPTED: u16 = 281;
/// Password required (RFC 4643 §2.3)
pub const PASSWORD_REQUIRED: u16 = 381;
/// Authentication required (RFC 4643 §2.3)
pub const AUTH_REQUIRED: u16 = 480;
