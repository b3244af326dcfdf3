//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::fmt;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::types::{LanguageCode, LanguageCodeParseError};

/// Command-line arguments for the nomadia-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Address of the backend chat endpoint.
    #[arrrg(
        optional,
        "Backend chat endpoint (default: $NOMADIA_BACKEND_URL or http://localhost:8000/chat)",
        "URL"
    )]
    pub backend_url: Option<String>,

    /// Language of the conversation.
    #[arrrg(optional, "Conversation language: fr, en or ar (default: fr)", "LANG")]
    pub language: Option<String>,

    /// Seconds to wait for the backend to accept a connection.
    #[arrrg(optional, "Connect timeout in seconds (default: none)", "SECONDS")]
    pub connect_timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Error returned when command-line arguments cannot be turned into a
/// [`ChatConfig`].
#[derive(Debug)]
pub enum ChatArgsError {
    /// `--language` named a language the assistant does not speak.
    InvalidLanguage(LanguageCodeParseError),
    /// `--connect-timeout` was zero.
    InvalidConnectTimeout,
}

impl fmt::Display for ChatArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatArgsError::InvalidLanguage(err) => write!(f, "{err}"),
            ChatArgsError::InvalidConnectTimeout => {
                write!(f, "connect timeout must be at least one second")
            }
        }
    }
}

impl std::error::Error for ChatArgsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatArgsError::InvalidLanguage(err) => Some(err),
            ChatArgsError::InvalidConnectTimeout => None,
        }
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend address; `None` defers to the environment, then the default.
    pub backend_url: Option<String>,

    /// Language of the conversation.
    pub language: LanguageCode,

    /// Optional connect timeout. Replies themselves are never timed out.
    pub connect_timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Backend: resolved when the client is built
    /// - Language: French
    /// - Connect timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            backend_url: None,
            language: LanguageCode::default(),
            connect_timeout: None,
            use_color: true,
        }
    }

    /// Sets the backend address.
    pub fn with_backend_url(mut self, backend_url: impl Into<String>) -> Self {
        self.backend_url = Some(backend_url.into());
        self
    }

    /// Sets the conversation language.
    pub fn with_language(mut self, language: LanguageCode) -> Self {
        self.language = language;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let language = match args.language {
            Some(code) => code
                .parse::<LanguageCode>()
                .map_err(ChatArgsError::InvalidLanguage)?,
            None => LanguageCode::default(),
        };
        let connect_timeout = match args.connect_timeout {
            Some(0) => return Err(ChatArgsError::InvalidConnectTimeout),
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => None,
        };

        Ok(ChatConfig {
            backend_url: args.backend_url,
            language,
            connect_timeout,
            use_color: !args.no_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.backend_url.is_none());
        assert_eq!(config.language, LanguageCode::Fr);
        assert!(config.connect_timeout.is_none());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            backend_url: Some("http://10.0.0.5:8000/chat".to_string()),
            language: Some("AR".to_string()),
            connect_timeout: Some(5),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(
            config.backend_url.as_deref(),
            Some("http://10.0.0.5:8000/chat")
        );
        assert_eq!(config.language, LanguageCode::Ar);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_rejects_unknown_language() {
        let args = ChatArgs {
            language: Some("de".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(matches!(err, ChatArgsError::InvalidLanguage(_)));
        assert!(err.to_string().contains("de"));
    }

    #[test]
    fn config_from_args_rejects_zero_timeout() {
        let args = ChatArgs {
            connect_timeout: Some(0),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(ChatArgsError::InvalidConnectTimeout)
        ));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_backend_url("https://nomadia.example/chat")
            .with_language(LanguageCode::En)
            .with_connect_timeout(Some(Duration::from_secs(2)))
            .without_color();

        assert_eq!(
            config.backend_url.as_deref(),
            Some("https://nomadia.example/chat")
        );
        assert_eq!(config.language, LanguageCode::En);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(2)));
        assert!(!config.use_color);
    }
}
