//! Command handling with action types
//!
//! This module provides a CommandHandler that decides what a client line
//! should trigger, separating command interpretation from execution in the
//! session.

use super::allowed::AllowedCommands;
use super::classifier::NntpCommand;

/// Action to take in response to a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction<'a> {
    /// Answer `381 Continue` and expect `AUTHINFO PASS` on the next line
    StartAuth { username: &'a str },
    /// Relay the line to the backend and switch to byte-pump mode
    Forward,
    /// Client wants to leave and `QUIT` is not whitelisted
    Quit,
    /// Answer with a 502 and keep reading
    Reject(Rejection<'a>),
}

/// Why a line was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection<'a> {
    /// Empty line or malformed AUTHINFO
    UnknownSyntax,
    /// Verb not on the whitelist, as typed by the client
    NotAllowed(&'a str),
}

/// Handler for processing commands and determining actions
#[derive(Debug, Clone)]
pub struct CommandHandler {
    allowed: AllowedCommands,
}

impl CommandHandler {
    pub fn new(allowed: AllowedCommands) -> Self {
        Self { allowed }
    }

    /// Whitelist consulted for relayed commands
    pub fn allowed(&self) -> &AllowedCommands {
        &self.allowed
    }

    /// Process a command line and return the action to take
    ///
    /// `AUTHINFO` is always handled locally, even if listed in the whitelist.
    pub fn handle_command<'a>(&self, line: &'a str) -> CommandAction<'a> {
        match NntpCommand::classify(line) {
            NntpCommand::AuthUser(username) => CommandAction::StartAuth { username },
            NntpCommand::AuthPass(_) | NntpCommand::AuthMalformed | NntpCommand::Empty => {
                CommandAction::Reject(Rejection::UnknownSyntax)
            }
            NntpCommand::Quit if self.allowed.is_allowed("QUIT") => CommandAction::Forward,
            NntpCommand::Quit => CommandAction::Quit,
            NntpCommand::Other(verb) if self.allowed.is_allowed(verb) => CommandAction::Forward,
            NntpCommand::Other(verb) => CommandAction::Reject(Rejection::NotAllowed(verb)),
        }
    }

    /// Extract the password from the line following `381 Continue`
    ///
    /// Returns `None` for anything but `AUTHINFO PASS <password>`.
    pub fn expect_auth_pass(line: &str) -> Option<&str> {
        match NntpCommand::classify(line) {
            NntpCommand::AuthPass(password) => Some(password),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> CommandHandler {
        CommandHandler::new(AllowedCommands::new(["ARTICLE", "body", "LIST"]))
    }

    #[test]
    fn test_auth_user_command() {
        assert_eq!(
            handler().handle_command("AUTHINFO USER test"),
            CommandAction::StartAuth { username: "test" }
        );
    }

    #[test]
    fn test_auth_pass_out_of_sequence() {
        assert_eq!(
            handler().handle_command("AUTHINFO PASS secret"),
            CommandAction::Reject(Rejection::UnknownSyntax)
        );
    }

    #[test]
    fn test_malformed_authinfo() {
        assert_eq!(
            handler().handle_command("AUTHINFO USER"),
            CommandAction::Reject(Rejection::UnknownSyntax)
        );
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(
            handler().handle_command(""),
            CommandAction::Reject(Rejection::UnknownSyntax)
        );
    }

    #[test]
    fn test_whitelisted_any_case() {
        let handler = handler();
        assert_eq!(handler.handle_command("article <x@y>"), CommandAction::Forward);
        assert_eq!(handler.handle_command("ARTICLE <x@y>"), CommandAction::Forward);
        assert_eq!(handler.handle_command("BODY 12"), CommandAction::Forward);
        assert_eq!(handler.handle_command("list active"), CommandAction::Forward);
    }

    #[test]
    fn test_not_allowed_echoes_verb() {
        assert_eq!(
            handler().handle_command("post"),
            CommandAction::Reject(Rejection::NotAllowed("post"))
        );
    }

    #[test]
    fn test_authinfo_never_forwarded() {
        let handler = CommandHandler::new(AllowedCommands::new(["AUTHINFO"]));
        assert_eq!(
            handler.handle_command("AUTHINFO USER bob"),
            CommandAction::StartAuth { username: "bob" }
        );
    }

    #[test]
    fn test_quit() {
        assert_eq!(handler().handle_command("QUIT"), CommandAction::Quit);

        let relaying = CommandHandler::new(AllowedCommands::new(["QUIT"]));
        assert_eq!(relaying.handle_command("quit"), CommandAction::Forward);
    }

    #[test]
    fn test_expect_auth_pass() {
        assert_eq!(
            CommandHandler::expect_auth_pass("AUTHINFO PASS hunter2"),
            Some("hunter2")
        );
        assert_eq!(
            CommandHandler::expect_auth_pass("authinfo pass two words"),
            Some("two words")
        );
        assert_eq!(CommandHandler::expect_auth_pass("AUTHINFO USER bob"), None);
        assert_eq!(CommandHandler::expect_auth_pass("AUTHINFO PASS"), None);
        assert_eq!(CommandHandler::expect_auth_pass("LIST"), None);
        assert_eq!(CommandHandler::expect_auth_pass(""), None);
    }
}
