//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the backend.

use crate::types::LanguageCode;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Switch the conversation language.
    Language(LanguageCode),

    /// List the available languages and show the active one.
    ListLanguages,

    /// Start or stop dictation.
    Microphone,

    /// Clear the conversation and greet again.
    Clear,

    /// Print the whole conversation.
    History,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use nomadia::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/lang ar").is_some());
/// assert!(parse_command("Où dormir à Tozeur ?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "lang" | "language" => match argument {
            Some(code) => match code.parse::<LanguageCode>() {
                Ok(language) => ChatCommand::Language(language),
                Err(err) => ChatCommand::Invalid(err.to_string()),
            },
            None => ChatCommand::ListLanguages,
        },
        "mic" | "dictate" => ChatCommand::Microphone,
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /lang [fr|en|ar]       Switch language (no argument lists them)
  /mic                   Start or stop dictation
  /clear                 Clear the conversation
  /history               Show the whole conversation
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl+C while a reply is streaming to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /QUIT  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_language() {
        assert_eq!(
            parse_command("/lang ar"),
            Some(ChatCommand::Language(LanguageCode::Ar))
        );
        assert_eq!(
            parse_command("/language EN"),
            Some(ChatCommand::Language(LanguageCode::En))
        );
        assert_eq!(parse_command("/lang"), Some(ChatCommand::ListLanguages));
        assert_eq!(parse_command("/lang   "), Some(ChatCommand::ListLanguages));
        assert!(matches!(
            parse_command("/lang de"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("de")
        ));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/mic"), Some(ChatCommand::Microphone));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/weather tunis"),
            Some(ChatCommand::Invalid("Unknown command: /weather".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Bonjour"), None);
        assert_eq!(parse_command("**/lang** ar"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/lang"));
        assert!(help.contains("/mic"));
        assert!(help.contains("/quit"));
    }
}
