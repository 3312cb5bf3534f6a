//! NNTP status line parsing
//!
//! Per [RFC 3977 §3.2](https://datatracker.ietf.org/doc/html/rfc3977#section-3.2):
//! ```text
//! status-line  = status-code SP status-text CRLF
//! status-code  = 3DIGIT
//! ```
//!
//! The proxy only inspects status lines during the backend AUTHINFO
//! exchange; relayed traffic is never parsed.

/// Parse a status code from the start of a response line
///
/// Returns `None` unless the line begins with three ASCII digits followed by
/// a space, CR, LF or the end of input.
#[inline]
pub fn parse_status_code(data: &[u8]) -> Option<u16> {
    if data.len() < 3 {
        return None;
    }

    let d0 = data[0].wrapping_sub(b'0');
    let d1 = data[1].wrapping_sub(b'0');
    let d2 = data[2].wrapping_sub(b'0');
    if d0 > 9 || d1 > 9 || d2 > 9 {
        return None;
    }

    match data.get(3) {
        None | Some(b' ') | Some(b'\r') | Some(b'\n') => {}
        Some(_) => return None,
    }

    Some(u16::from(d0) * 100 + u16::from(d1) * 10 + u16::from(d2))
}

/// Check if a response line carries exactly `code`
#[inline]
pub fn is_response_code(data: &[u8], code: u16) -> bool {
    parse_status_code(data) == Some(code)
}

/// Status line with its trailing CRLF removed, for logs
pub fn status_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim_end().to_string()
}
