use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

/// The author of a message in the conversation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The visitor typing into the widget.
    User,

    /// The assistant answering from the backend.
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// Error returned when parsing an invalid role string.
#[derive(Debug)]
pub struct RoleParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown role: {}", self.invalid_value)
    }
}

impl std::error::Error for RoleParseError {}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            _ => Err(RoleParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Opaque identifier of a message, unique within a session.
///
/// Identifiers are handed out in creation order, so comparing two ids also
/// compares their creation order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Wraps a raw identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a message came to its final text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// The message was typed by the user or fully streamed from the backend.
    #[default]
    Complete,

    /// The backend could not be reached; the text is a diagnostic.
    Failed,

    /// The stream was stopped before the backend finished.
    Interrupted,
}

/// A completed, immutable message of the conversation.
///
/// Replies that are still streaming live in a
/// [`PendingReply`](crate::chat::PendingReply) and only become a `Message`
/// once their stream ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    text: String,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(default)]
    status: MessageStatus,
}

impl Message {
    /// Creates a complete message.
    pub fn new(id: MessageId, role: Role, text: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            timestamp,
            status: MessageStatus::Complete,
        }
    }

    /// Sets the completion status.
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    /// Returns true if this message was written by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Formats the creation time as `HH:MM`.
    pub fn display_time(&self) -> String {
        let format = format_description!("[hour]:[minute]");
        self.timestamp
            .format(&format)
            .unwrap_or_else(|_| String::from("--:--"))
    }
}
