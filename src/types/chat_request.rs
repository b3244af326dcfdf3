use serde::{Deserialize, Serialize};

use crate::types::{LanguageCode, Message, Role};

/// One prior turn as sent to the backend: the role and the text, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who wrote the turn.
    pub role: Role,
    /// What was written.
    pub text: String,
}

impl HistoryEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self::new(message.role(), message.text())
    }
}

/// Body of a request to the backend chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The text the user just submitted.
    pub message: String,
    /// Every earlier turn of the conversation, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Language the answer should be written in.
    pub language: LanguageCode,
}

impl ChatRequest {
    /// Creates a request from the conversation so far and the new user text.
    pub fn new(history: &[Message], message: impl Into<String>, language: LanguageCode) -> Self {
        Self {
            message: message.into(),
            history: history.iter().map(HistoryEntry::from).collect(),
            language,
        }
    }
}
