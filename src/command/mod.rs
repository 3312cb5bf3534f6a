//! Command processing module
//!
//! This module handles NNTP command classification and whitelisting.
//! It decides what a client line should do without touching any socket.

mod allowed;
pub mod classifier;
mod handler;

pub use allowed::AllowedCommands;
pub use classifier::NntpCommand;
pub use handler::{CommandAction, CommandHandler, Rejection};
