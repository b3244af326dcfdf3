//! The conversation layer of the Nomadia widget.
//!
//! This module provides the conversation state manager and the pieces the
//! `nomadia-chat` REPL is built from:
//!
//! - [`session`]: the ordered conversation and the one-turn-at-a-time guard
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer, transport_failure_notice};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatArgsError, ChatConfig};
pub use session::{
    ChatSession, IgnoreReason, PendingReply, SessionStats, Submission, Turn, TurnState,
};
