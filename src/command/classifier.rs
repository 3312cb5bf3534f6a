//! Command classification logic for NNTP commands

/// Shape of a single client command line
///
/// Only the first whitespace-delimited token is interpreted, and only
/// `AUTHINFO` and `QUIT` get a closer look. Everything else is carried as
/// its verb so the dispatcher can check it against the whitelist.
#[derive(Debug, PartialEq, Eq)]
pub enum NntpCommand<'a> {
    /// Blank or whitespace-only line
    Empty,
    /// `AUTHINFO USER <name>` - starts the local authentication exchange
    AuthUser(&'a str),
    /// `AUTHINFO PASS <password>` - only valid right after `AuthUser`
    AuthPass(&'a str),
    /// Any other `AUTHINFO` form (missing argument, SASL, GENERIC, ...)
    AuthMalformed,
    /// `QUIT`
    Quit,
    /// Anything else, carrying the verb exactly as the client typed it
    Other(&'a str),
}

impl<'a> NntpCommand<'a> {
    /// Classify a command line (without its trailing CRLF)
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        let Some((verb, rest)) = split_token(line) else {
            return Self::Empty;
        };

        if verb.eq_ignore_ascii_case("AUTHINFO") {
            return Self::classify_authinfo(rest);
        }
        if verb.eq_ignore_ascii_case("QUIT") {
            return Self::Quit;
        }
        Self::Other(verb)
    }

    fn classify_authinfo(args: &'a str) -> Self {
        let Some((sub, value)) = split_token(args) else {
            return Self::AuthMalformed;
        };
        if value.is_empty() {
            return Self::AuthMalformed;
        }

        if sub.eq_ignore_ascii_case("USER") {
            // Usernames are a single token; trailing junk is ignored.
            match split_token(value) {
                Some((user, _)) => Self::AuthUser(user),
                None => Self::AuthMalformed,
            }
        } else if sub.eq_ignore_ascii_case("PASS") {
            // Passwords may contain spaces: everything after `PASS ` is the password.
            Self::AuthPass(value)
        } else {
            Self::AuthMalformed
        }
    }
}

/// Split off the first whitespace-delimited token, returning it and the
/// remainder with leading whitespace removed
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(|c: char| c.is_ascii_whitespace()) {
        Some(end) => Some((&s[..end], s[end..].trim_start())),
        None => Some((s, "")),
    }
}
