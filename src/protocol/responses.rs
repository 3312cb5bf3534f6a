//! Client-facing response lines
//!
//! Every line the proxy itself writes to a client lives here. The `502`
//! texts are what existing clients and monitoring scripts match on, so they
//! must not be reworded.

/// Line ending: "\r\n"
pub const CRLF: &[u8] = b"\r\n";

/// Default greeting sent when a client connects (200)
pub const PROXY_GREETING: &[u8] = b"200 Welcome to NNTP Proxy!\r\n";

// Authentication responses (RFC 4643)

/// `AUTHINFO USER` accepted, password expected next (381)
pub const AUTH_CONTINUE: &[u8] = b"381 Continue\r\n";

/// Client authenticated and attached to a backend (281)
pub const AUTH_ACCEPTED: &[u8] = b"281 Welcome\r\n";

/// Unknown user or wrong password (502)
pub const AUTH_FAILED: &[u8] = b"502 Authentication Failed\r\n";

/// User already at their connection limit (502)
pub const TOO_MANY_CONNECTIONS: &[u8] = b"502 Too Many Connections\r\n";

/// Every backend is at capacity (502)
pub const NO_FREE_BACKEND: &[u8] = b"502 NO free backend connection!\r\n";

/// Backend connect or AUTHINFO exchange failed (502)
pub const BACKEND_AUTH_FAILED: &[u8] = b"502 Backend AUTH Failed!\r\n";

/// Malformed AUTHINFO sequence or empty command line (502)
pub const UNKNOWN_SYNTAX: &[u8] = b"502 Unknown Syntax!\r\n";

/// Whitelisted command sent before authenticating (480)
pub const AUTH_REQUIRED_FOR_COMMAND: &[u8] = b"480 Authentication required\r\n";

/// Answer to `QUIT` before a backend is attached (205)
pub const GOODBYE: &[u8] = b"205 Goodbye\r\n";

/// Construct a greeting response (200)
///
/// # Examples
/// ```
/// use nntp_auth_proxy::protocol::greeting;
///
/// let msg = greeting("news.example.com ready");
/// assert_eq!(msg, "200 news.example.com ready\r\n");
/// ```
#[inline]
pub fn greeting(message: &str) -> String {
    format!("200 {}\r\n", message)
}

/// Construct the rejection for a command outside the whitelist (502)
///
/// The command is echoed exactly as the client sent it.
///
/// # Examples
/// ```
/// use nntp_auth_proxy::protocol::command_not_allowed;
///
/// assert_eq!(command_not_allowed("POST"), "502 POST not allowed\r\n");
/// ```
#[inline]
pub fn command_not_allowed(command: &str) -> String {
    format!("502 {} not allowed\r\n", command)
}
