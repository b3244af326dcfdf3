use std::env;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client as ReqwestClient, Response};
use reqwest::header::{self, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::client_logger::ClientLogger;
use crate::decoder::Utf8Decoder;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_CANCELLATIONS, CLIENT_FAILURES, CLIENT_REQUESTS, STREAM_BYTES, STREAM_CHUNKS,
    STREAM_DURATION, STREAM_TTFB,
};
use crate::types::{ChatRequest, LanguageCode, Message, MessageStatus};

/// Backend address used when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/chat";

/// Environment variable consulted for the backend address.
pub const BACKEND_URL_ENV: &str = "NOMADIA_BACKEND_URL";

/////////////////////////////////////////////// ChunkSink //////////////////////////////////////////////

/// Receives the text of a reply as it streams in.
///
/// Closures taking `&str` are sinks that never ask to stop.
pub trait ChunkSink: Send {
    /// Called once per decoded fragment, in arrival order.
    fn on_chunk(&mut self, text: &str);

    /// Checked before every read; returning true ends the stream early and
    /// releases the connection.
    fn should_stop(&self) -> bool {
        false
    }

    /// A token that ends the stream once cancelled, even while the client
    /// is still waiting on the backend.
    fn stop_signal(&self) -> Option<CancellationToken> {
        None
    }
}

impl<F> ChunkSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_chunk(&mut self, text: &str) {
        self(text)
    }
}

/////////////////////////////////////////////// Interrupt //////////////////////////////////////////////

/// A stop request shared between a signal handler and the reply in flight.
///
/// Every reply watches a fresh [`CancellationToken`]; [`trigger`](Self::trigger)
/// cancels the current one, which wakes a client stuck on a silent backend.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    token: Arc<Mutex<CancellationToken>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the reply in flight, or the next one if none is streaming.
    pub fn trigger(&self) {
        self.token().cancel();
    }

    /// Arms a fresh token after a trigger.
    pub fn reset(&self) {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.token().is_cancelled()
    }

    /// The token the current reply should watch.
    pub fn token(&self) -> CancellationToken {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

///////////////////////////////////////////// StreamOutcome ////////////////////////////////////////////

/// How a streamed reply ended.
///
/// Every outcome is a normal return. A `Failed` stream has already delivered
/// its diagnostic through the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamOutcome {
    /// The backend closed the stream after sending a reply.
    Completed,
    /// The backend could not be reached or the body broke off.
    Failed,
    /// The sink asked to stop before the backend finished.
    Cancelled,
}

impl StreamOutcome {
    /// The status a reply that ended this way carries.
    pub fn message_status(self) -> MessageStatus {
        match self {
            StreamOutcome::Completed => MessageStatus::Complete,
            StreamOutcome::Failed => MessageStatus::Failed,
            StreamOutcome::Cancelled => MessageStatus::Interrupted,
        }
    }
}

////////////////////////////////////////////// ChatBackend /////////////////////////////////////////////

/// Something that answers a user turn with a stream of text.
///
/// ```
/// use async_trait::async_trait;
/// use nomadia::{ChatBackend, ChatRequest, ChunkSink, LanguageCode, StreamOutcome};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ChatBackend for Echo {
///     async fn stream_request(
///         &self,
///         request: &ChatRequest,
///         sink: &mut dyn ChunkSink,
///     ) -> StreamOutcome {
///         sink.on_chunk(&request.message);
///         StreamOutcome::Completed
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let mut text = String::new();
/// let outcome = Echo
///     .stream_response(&[], "Salam", LanguageCode::Ar, &mut |chunk: &str| {
///         text.push_str(chunk)
///     })
///     .await;
/// assert_eq!(outcome, StreamOutcome::Completed);
/// assert_eq!(text, "Salam");
/// # });
/// ```
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and feed the reply to `sink` until the stream ends.
    ///
    /// Implementations never fail: transport errors become a single
    /// diagnostic chunk and a [`StreamOutcome::Failed`] return.
    async fn stream_request(&self, request: &ChatRequest, sink: &mut dyn ChunkSink)
    -> StreamOutcome;

    /// Stream the reply to `message`, given the conversation that preceded it.
    ///
    /// Only role and text of each history entry are sent.
    async fn stream_response(
        &self,
        history: &[Message],
        message: &str,
        language: LanguageCode,
        sink: &mut dyn ChunkSink,
    ) -> StreamOutcome {
        let request = ChatRequest::new(history, message, language);
        self.stream_request(&request, sink).await
    }
}

/////////////////////////////////////////////// ChatClient /////////////////////////////////////////////

/// HTTP client for the Nomadia chat backend.
///
/// Each turn is a single POST of a JSON [`ChatRequest`]; the reply is the raw
/// response body, decoded as UTF-8 and forwarded read by read.
#[derive(Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    backend_url: String,
    connect_timeout: Option<Duration>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("backend_url", &self.backend_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl ChatClient {
    /// Create a new client.
    ///
    /// The backend address can be provided directly or read from the
    /// NOMADIA_BACKEND_URL environment variable; it defaults to
    /// [`DEFAULT_BACKEND_URL`].
    pub fn new(backend_url: Option<String>) -> Result<Self> {
        Self::with_options(backend_url, None)
    }

    /// Create a new client with a connect timeout.
    ///
    /// There is deliberately no whole-request timeout: replies stream for as
    /// long as the backend keeps writing.
    pub fn with_options(
        backend_url: Option<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let backend_url = resolve_backend_url(backend_url);
        let parsed = url::Url::parse(&backend_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(
                format!("unsupported scheme {:?} in {backend_url}", parsed.scheme()),
                Some("backend_url".to_string()),
            ));
        }

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            backend_url,
            connect_timeout,
            logger: None,
        })
    }

    /// Install a logger that sees every request, chunk and failure.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The address requests are sent to.
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// The configured connect timeout, if any.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response> {
        let body = serde_json::to_vec(request)?;
        self.client
            .post(&self.backend_url)
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(header::ACCEPT, HeaderValue::from_static("text/plain"))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("POST {}: {}", self.backend_url, e),
                        self.connect_timeout.map(|t| t.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("POST {}: {}", self.backend_url, e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("POST {}: {}", self.backend_url, e), Some(Box::new(e)))
                }
            })
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn stream_request(
        &self,
        request: &ChatRequest,
        sink: &mut dyn ChunkSink,
    ) -> StreamOutcome {
        CLIENT_REQUESTS.click();
        let logger = self.logger.as_deref();
        if let Some(logger) = logger {
            logger.log_request(request);
        }

        let started = Instant::now();
        let mut stats = RelayStats::default();
        let signal = sink.stop_signal();
        // Whatever the status, a body present is a reply to stream.
        let relayed = tokio::select! {
            biased;
            _ = stopped(signal.as_ref()) => {
                CLIENT_CANCELLATIONS.click();
                Ok(StreamOutcome::Cancelled)
            }
            sent = self.send(request) => match sent {
                Ok(response) => {
                    relay_chunks(response.bytes_stream(), sink, logger, started, &mut stats).await
                }
                Err(err) => Err(err),
            },
        };
        let outcome = match relayed {
            Ok(outcome) => outcome,
            Err(err) => {
                CLIENT_FAILURES.click();
                if let Some(logger) = logger {
                    logger.log_failure(&err);
                }
                sink.on_chunk(request.language.connection_diagnostic());
                StreamOutcome::Failed
            }
        };
        STREAM_DURATION.add(started.elapsed().as_secs_f64());
        if let Some(logger) = logger {
            logger.log_complete(outcome, stats.bytes, stats.chunks);
        }
        outcome
    }
}

/// Resolve the backend address: explicit value, then environment, then default.
pub fn resolve_backend_url(explicit: Option<String>) -> String {
    explicit
        .filter(|url| !url.trim().is_empty())
        .or_else(|| {
            env::var(BACKEND_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

//////////////////////////////////////////////// relaying //////////////////////////////////////////////

#[derive(Debug, Default)]
struct RelayStats {
    bytes: u64,
    chunks: u64,
}

async fn relay_chunks<S, E>(
    stream: S,
    sink: &mut dyn ChunkSink,
    logger: Option<&dyn ClientLogger>,
    started: Instant,
    stats: &mut RelayStats,
) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    futures::pin_mut!(stream);
    let signal = sink.stop_signal();
    let mut decoder = Utf8Decoder::new();

    loop {
        if sink.should_stop() {
            CLIENT_CANCELLATIONS.click();
            return Ok(StreamOutcome::Cancelled);
        }
        let read = tokio::select! {
            biased;
            _ = stopped(signal.as_ref()) => {
                CLIENT_CANCELLATIONS.click();
                return Ok(StreamOutcome::Cancelled);
            }
            read = stream.next() => read,
        };
        let Some(read) = read else {
            break;
        };
        let bytes = read.map_err(|e| {
            Error::streaming(
                format!("response body broke off: {}", e),
                Some(Box::new(e)),
            )
        })?;
        if bytes.is_empty() {
            continue;
        }
        if stats.bytes == 0 {
            STREAM_TTFB.add(started.elapsed().as_secs_f64());
        }
        stats.bytes += bytes.len() as u64;
        STREAM_BYTES.count(bytes.len() as u64);
        let text = decoder.decode(&bytes);
        emit(&text, sink, logger, stats);
    }

    let tail = decoder.finish();
    emit(&tail, sink, logger, stats);
    if stats.bytes == 0 {
        return Err(Error::streaming("backend sent an empty body", None));
    }
    Ok(StreamOutcome::Completed)
}

/// Resolves once `signal` is cancelled; never, without one.
async fn stopped(signal: Option<&CancellationToken>) {
    match signal {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn emit(
    text: &str,
    sink: &mut dyn ChunkSink,
    logger: Option<&dyn ClientLogger>,
    stats: &mut RelayStats,
) {
    if text.is_empty() {
        return;
    }
    STREAM_CHUNKS.click();
    stats.chunks += 1;
    if let Some(logger) = logger {
        logger.log_chunk(text);
    }
    sink.on_chunk(text);
}
