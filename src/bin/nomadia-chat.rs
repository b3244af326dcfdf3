//! Interactive chat with the Nomadia travel assistant.
//!
//! This binary is the terminal rendition of the website's chat widget: it
//! greets in the chosen language, streams each answer from the backend and
//! shows images and maps as links.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on localhost:8000
//! nomadia-chat
//!
//! # Pick the backend and the language
//! nomadia-chat --backend-url http://10.0.0.5:8000/chat --language en
//!
//! # Disable colors (useful for piping output)
//! nomadia-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/lang <fr|en|ar>` - Switch language
//! - `/mic` - Start or stop dictation
//! - `/clear` - Clear the conversation
//! - `/history` - Show the conversation
//! - `/help` - Show available commands
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use nomadia::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, Submission,
    help_text, parse_command, transport_failure_notice,
};
use nomadia::{Dictation, Interrupt, LanguageCode, StreamOutcome, UnsupportedSpeech};

/// Main entry point for the nomadia-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("nomadia-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let mut session = ChatSession::from_config(&config)?;
    let interrupt = Interrupt::new();
    let mut renderer = PlainTextRenderer::with_color(config.use_color)
        .with_language(config.language)
        .with_interrupt(interrupt.clone());
    let mut dictation = Dictation::new(&UnsupportedSpeech);
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C while a reply streams stops that reply, even if the backend
    // has gone quiet.
    let handler_interrupt = interrupt.clone();
    ctrlc::set_handler(move || {
        handler_interrupt.trigger();
    })?;

    print_banner(config.language);
    session.open();
    for message in session.messages() {
        renderer.print_message(message);
    }

    let mut dictated = String::new();
    loop {
        interrupt.reset();
        for notice in dictation.poll_events(&mut dictated) {
            renderer.print_info(&notice);
        }

        let readline = rl.readline_with_initial("> ", (&dictated, ""));
        dictated.clear();

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Language(language) => {
                            session.set_language(language);
                            renderer.set_language(language);
                            renderer.print_info(&format!(
                                "{} {} ({})",
                                language.flag(),
                                language.name(),
                                language.placeholder()
                            ));
                        }
                        ChatCommand::ListLanguages => {
                            print_languages(session.language());
                        }
                        ChatCommand::Microphone => {
                            let was_listening = dictation.is_listening();
                            match dictation.toggle(session.language()) {
                                Some(notice) => renderer.print_info(&notice),
                                None if was_listening => {
                                    renderer.print_info("Dictation stopped.")
                                }
                                None if dictation.is_available() => {
                                    renderer.print_info("Listening...")
                                }
                                None => {}
                            }
                        }
                        ChatCommand::Clear => {
                            if let Err(err) = session.clear() {
                                renderer.print_error(&err.to_string());
                                continue;
                            }
                            renderer.print_info("Conversation cleared.");
                            session.open();
                            for message in session.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::History => {
                            for message in session.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session, &config);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                match session.submit_user_turn(line, &mut renderer).await {
                    Submission::Answered {
                        outcome: StreamOutcome::Failed,
                        ..
                    } => {
                        renderer.print_error(&transport_failure_notice(
                            session.backend().backend_url(),
                        ));
                    }
                    Submission::Answered { .. } => {}
                    Submission::Ignored(reason) => {
                        renderer.print_error(&format!("message not sent: {reason:?}"));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_banner(language: LanguageCode) {
    println!("Nomadia ({} {})", language.flag(), language.name());
    println!("Type /help for commands, /quit to exit\n");
}

fn print_languages(active: LanguageCode) {
    println!("    Languages:");
    for language in LanguageCode::ALL {
        let marker = if language == active { " (active)" } else { "" };
        println!(
            "      {}  {} {}{}",
            language.code(),
            language.flag(),
            language.name(),
            marker
        );
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Language: {}", stats.language.name());
    println!("      Messages: {}", stats.message_count);
    println!("      Turns: {}", stats.total_turns);
    println!("      Failed turns: {}", stats.failed_turns);
    println!("      Interrupted turns: {}", stats.interrupted_turns);
}

fn print_config(session: &ChatSession, config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Backend: {}", session.backend().backend_url());
    println!("      Language: {}", session.language());
    match session.backend().connect_timeout() {
        Some(timeout) => println!("      Connect timeout: {}s", timeout.as_secs()),
        None => println!("      Connect timeout: (none)"),
    }
    println!(
        "      Color: {}",
        if config.use_color {
            "enabled"
        } else {
            "disabled"
        }
    );
}
