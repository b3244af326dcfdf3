//! Output rendering for the chat front end.
//!
//! This module provides the [`Renderer`] trait the session reports to while a
//! reply streams, and a plain-text implementation that turns parsed segments
//! into terminal output with optional ANSI styling.

use std::io::{self, Stdout, Write};

use tokio_util::sync::CancellationToken;

use crate::chat::PendingReply;
use crate::client::Interrupt;
use crate::parser::parse;
use crate::types::{LanguageCode, Message, MessageStatus, Segment, TextDirection};

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for timestamps and the status line).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for map references).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for images).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for the user's name).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for failed replies).
const ANSI_RED: &str = "\x1b[31m";

/// Returns the cursor to column zero and erases the line.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Right-to-left mark, so terminals that honour it lay out Arabic lines.
const RLM: char = '\u{200F}';

/// Widest status line, in characters.
const STATUS_WIDTH: usize = 72;

/////////////////////////////////////////////// Renderer ///////////////////////////////////////////////

/// Receives conversation output as it happens.
pub trait Renderer: Send {
    /// Called when the UI language changes.
    fn set_language(&mut self, language: LanguageCode) {
        _ = language;
    }

    /// Called once before the first fragment of a reply.
    fn start_reply(&mut self, reply: &PendingReply) {
        _ = reply;
    }

    /// Called after every fragment with the reply text so far.
    fn update_reply(&mut self, reply: &PendingReply);

    /// Called with the finished reply.
    fn finish_reply(&mut self, message: &Message);

    /// Shows one complete message.
    fn print_message(&mut self, message: &Message);

    /// Shows an error that is not part of the conversation.
    fn print_error(&mut self, error: &str);

    /// Shows an informational notice.
    fn print_info(&mut self, info: &str);

    /// Returns true to stop the reply that is streaming.
    fn should_interrupt(&self) -> bool {
        false
    }

    /// A token that stops the streaming reply as soon as it is cancelled.
    fn interrupt_signal(&self) -> Option<CancellationToken> {
        None
    }
}

/// Renders parsed segments as a single string.
///
/// Images and maps have no terminal form, so they become labelled links; map
/// links point at the embeddable map for `language`.
pub fn render_segments(segments: &[Segment], language: LanguageCode, use_color: bool) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::PlainText { text } => out.push_str(text),
            Segment::Bold { text } => {
                if use_color {
                    out.push_str(&format!("{ANSI_BOLD}{text}{ANSI_RESET}"));
                } else {
                    out.push_str(text);
                }
            }
            Segment::Image { alt, url } => {
                if use_color {
                    out.push_str(&format!("{ANSI_YELLOW}[image: {alt}]{ANSI_RESET} {url}"));
                } else {
                    out.push_str(&format!("[image: {alt}] {url}"));
                }
            }
            Segment::MapReference(map) => {
                let label = format!("[map: {}, {}]", map.latitude, map.longitude);
                let url = map.embed_url(language);
                if use_color {
                    out.push_str(&format!("{ANSI_CYAN}{label}{ANSI_RESET} {url}"));
                } else {
                    out.push_str(&format!("{label} {url}"));
                }
            }
        }
    }
    out
}

/// One line summarizing a reply in progress: the tail of its rendered text
/// with line breaks folded, at most `width` characters.
pub fn status_preview(text: &str, language: LanguageCode, width: usize) -> String {
    let rendered = render_segments(&parse(text), language, false);
    let folded = rendered.split_whitespace().collect::<Vec<_>>().join(" ");
    let count = folded.chars().count();
    if count <= width {
        return folded;
    }
    let keep = width.saturating_sub(1);
    let tail: String = folded.chars().skip(count - keep).collect();
    format!("…{tail}")
}

/// Notice shown under a failed reply.
///
/// A failed stream may never have connected, may have broken off, or may
/// have had an empty body, so the notice names only the transport.
pub fn transport_failure_notice(backend_url: &str) -> String {
    format!("no complete reply from {backend_url} (connection failed or closed early)")
}

/////////////////////////////////////////// PlainTextRenderer //////////////////////////////////////////

/// Plain text renderer with optional ANSI styling.
///
/// While a reply streams, a single status line shows its tail; when the reply
/// completes the line is replaced by the full, re-parsed message.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    language: LanguageCode,
    status_visible: bool,
    interrupt: Option<Interrupt>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            language: LanguageCode::default(),
            status_visible: false,
            interrupt: None,
        }
    }

    /// Attaches the interrupt a Ctrl+C handler triggers.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Sets the language map links and labels are rendered for.
    pub fn with_language(mut self, language: LanguageCode) -> Self {
        self.language = language;
        self
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn clear_status(&mut self) {
        if self.status_visible {
            print!("{CLEAR_LINE}");
            self.status_visible = false;
            self.flush();
        }
    }

    fn format_message(&self, message: &Message) -> String {
        let time = message.display_time();
        let header = match (message.is_user(), self.use_color) {
            (true, true) => format!("{ANSI_DIM}{time}{ANSI_RESET} {ANSI_GREEN}you{ANSI_RESET}"),
            (true, false) => format!("{time} you"),
            (false, true) => format!("{ANSI_DIM}{time}{ANSI_RESET} {ANSI_BOLD}nomadia{ANSI_RESET}"),
            (false, false) => format!("{time} nomadia"),
        };

        let segments = parse(message.text());
        let mut body = match message.status() {
            // A nested reset would end the red early, so failed text is flat.
            MessageStatus::Failed if self.use_color => format!(
                "{ANSI_RED}{}{ANSI_RESET}",
                render_segments(&segments, self.language, false)
            ),
            _ => render_segments(&segments, self.language, self.use_color),
        };
        if message.status() == MessageStatus::Interrupted {
            body.push_str(" [interrupted]");
        }
        if self.language.direction() == TextDirection::Rtl {
            body = body
                .lines()
                .map(|line| format!("{RLM}{line}"))
                .collect::<Vec<_>>()
                .join("\n");
        }
        format!("{header}\n{body}\n")
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn set_language(&mut self, language: LanguageCode) {
        self.language = language;
    }

    fn start_reply(&mut self, _: &PendingReply) {
        if let Some(interrupt) = &self.interrupt {
            interrupt.reset();
        }
    }

    fn update_reply(&mut self, reply: &PendingReply) {
        let preview = status_preview(reply.text(), self.language, STATUS_WIDTH);
        if self.use_color {
            print!("{CLEAR_LINE}{ANSI_DIM}{preview}{ANSI_RESET}");
        } else {
            print!("{CLEAR_LINE}{preview}");
        }
        self.status_visible = true;
        self.flush();
    }

    fn finish_reply(&mut self, message: &Message) {
        self.clear_status();
        self.print_message(message);
    }

    fn print_message(&mut self, message: &Message) {
        print!("{}", self.format_message(message));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.clear_status();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.clear_status();
        println!("{info}");
        self.flush();
    }

    fn should_interrupt(&self) -> bool {
        self.interrupt.as_ref().is_some_and(Interrupt::is_triggered)
    }

    fn interrupt_signal(&self) -> Option<CancellationToken> {
        self.interrupt.as_ref().map(Interrupt::token)
    }
}
