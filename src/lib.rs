//! Client library for the Nomadia travel assistant.
//!
//! The pieces with substance are the stream client, which turns the
//! backend's chunked reply into text fragments, and the content parser,
//! which splits a reply into plain text, bold spans, images and map
//! references:
//!
//! ```
//! use nomadia::{Segment, parse};
//!
//! let segments = parse("Voici **Djerba** [MAP: 33.8, 10.85]");
//! assert_eq!(
//!     segments,
//!     vec![
//!         Segment::plain("Voici "),
//!         Segment::bold("Djerba"),
//!         Segment::plain(" "),
//!         Segment::map(33.8, 10.85),
//!     ]
//! );
//! ```

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod decoder;
pub mod error;
pub mod observability;
pub mod parser;
pub mod render;
pub mod speech;
pub mod types;

// Re-exports
pub use chat::{ChatSession, PendingReply};
pub use client::{
    BACKEND_URL_ENV, ChatBackend, ChatClient, ChunkSink, DEFAULT_BACKEND_URL, Interrupt,
    StreamOutcome,
};
pub use client_logger::ClientLogger;
pub use decoder::Utf8Decoder;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use parser::parse;
pub use render::{PlainTextRenderer, Renderer, render_segments};
pub use speech::{
    Availability, Dictation, SpeechCapability, SpeechErrorKind, SpeechEvent, SpeechProvider,
    UnsupportedSpeech,
};
pub use types::*;
