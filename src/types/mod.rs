// Public modules
pub mod chat_request;
pub mod language;
pub mod message;
pub mod segment;

// Re-exports
pub use chat_request::{ChatRequest, HistoryEntry};
pub use language::{LanguageCode, LanguageCodeParseError, TextDirection};
pub use message::{Message, MessageId, MessageStatus, Role, RoleParseError};
pub use segment::{MAP_EMBED_ZOOM, MapReference, Segment};
