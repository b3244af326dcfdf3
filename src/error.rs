//! Error types for the Nomadia chat client.
//!
//! Most failures never reach the caller: the stream client turns transport
//! errors into a diagnostic chunk for the user. This type is what the
//! plumbing underneath reports, and what loggers get to see.

use std::error;
use std::fmt;
use std::sync::Arc;

/// Boxed cause handed to the constructors.
pub type BoxedCause = Box<dyn error::Error + Send + Sync>;

/// Shared cause kept inside an [`Error`] so that it stays cheap to clone.
pub type Cause = Arc<dyn error::Error + Send + Sync>;

/// Everything that can go wrong between the widget and the backend.
#[derive(Clone, Debug)]
pub enum Error {
    /// Nothing answered at the backend address.
    Connection { message: String, source: Option<Cause> },

    /// The backend did not accept the connection within the connect timeout.
    Timeout {
        message: String,
        /// Seconds waited, when a timeout was configured.
        duration: Option<f64>,
    },

    /// reqwest failed for a reason other than connecting.
    HttpClient { message: String, source: Option<Cause> },

    /// A request body could not be encoded.
    Serialization { message: String, source: Option<Cause> },

    /// The backend address is not a URL.
    Url {
        message: String,
        source: Option<url::ParseError>,
    },

    /// The reply body broke off, or there was no body at all.
    Streaming { message: String, source: Option<Cause> },

    /// A caller-supplied value was rejected.
    Validation {
        message: String,
        /// Name of the offending parameter.
        param: Option<String>,
    },

    /// The host lacks an optional capability such as speech recognition.
    Unsupported { capability: String },
}

impl Error {
    pub fn connection(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    pub fn http_client(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn serialization(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    pub fn streaming(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    pub fn unsupported(capability: impl Into<String>) -> Self {
        Error::Unsupported {
            capability: capability.into(),
        }
    }

    /// The backend could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// The backend was reached but its reply did not arrive in full.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. })
    }

    /// A request body could not be encoded.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection { message, .. } => write!(f, "backend unreachable: {message}"),
            Error::Timeout {
                message,
                duration: Some(seconds),
            } => write!(f, "backend timed out after {seconds}s: {message}"),
            Error::Timeout { message, .. } => write!(f, "backend timed out: {message}"),
            Error::HttpClient { message, .. } => write!(f, "HTTP client error: {message}"),
            Error::Serialization { message, .. } => write!(f, "cannot encode request: {message}"),
            Error::Url { message, .. } => write!(f, "bad backend address: {message}"),
            Error::Streaming { message, .. } => write!(f, "reply stream failed: {message}"),
            Error::Validation {
                message,
                param: Some(param),
            } => write!(f, "invalid {param}: {message}"),
            Error::Validation { message, .. } => write!(f, "invalid value: {message}"),
            Error::Unsupported { capability } => {
                write!(f, "{capability} is not available on this host")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. }
            | Error::Streaming { source, .. } => {
                source.as_deref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Timeout { .. } | Error::Validation { .. } | Error::Unsupported { .. } => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(err.to_string(), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(err.to_string(), Some(err))
    }
}

/// A specialized Result type for Nomadia operations.
pub type Result<T> = std::result::Result<T, Error>;
