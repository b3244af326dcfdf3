//! Logging trait for backend client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log every exchange passing through the [`ChatClient`](crate::ChatClient).

use crate::{ChatRequest, Error, StreamOutcome};

/// A trait for logging chat client operations.
///
/// Implement this trait to record requests sent to the backend, the text
/// fragments streamed back, and any transport failure that was turned into a
/// diagnostic for the user.
///
/// # Example
///
/// ```rust,ignore
/// use nomadia::{ChatRequest, ClientLogger, Error, StreamOutcome};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         eprintln!("request: {}", serde_json::to_string(request).unwrap());
///     }
///
///     fn log_chunk(&self, text: &str) {
///         eprintln!("chunk: {text:?}");
///     }
///
///     fn log_failure(&self, error: &Error) {
///         eprintln!("failure: {error}");
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &ChatRequest);

    /// Log a decoded text fragment, in arrival order.
    fn log_chunk(&self, text: &str);

    /// Log a failure that was absorbed into a diagnostic chunk.
    fn log_failure(&self, error: &Error);

    /// Log the end of a stream.
    ///
    /// `bytes` counts raw body bytes and `chunks` counts the fragments
    /// handed to the caller.
    fn log_complete(&self, outcome: StreamOutcome, bytes: u64, chunks: u64) {
        _ = outcome;
        _ = bytes;
        _ = chunks;
    }
}
