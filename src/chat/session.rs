//! Conversation state for one chat widget.
//!
//! A [`ChatSession`] owns the ordered list of completed messages and drives
//! one turn at a time through a [`ChatBackend`]. The reply being streamed is
//! not a `Message` yet: it is a [`PendingReply`] owned by the active turn and
//! promoted into the conversation only when its stream ends.

use std::time::Instant;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::chat::config::ChatConfig;
use crate::client::{ChatBackend, ChatClient, ChunkSink, StreamOutcome};
use crate::error::{Error, Result};
use crate::observability::{SESSION_REJECTED_TURNS, SESSION_TURN_DURATION, SESSION_TURNS};
use crate::render::Renderer;
use crate::types::{ChatRequest, HistoryEntry, LanguageCode, Message, MessageId, MessageStatus, Role};

////////////////////////////////////////////// PendingReply ////////////////////////////////////////////

/// A model reply that is still receiving text.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReply {
    id: MessageId,
    timestamp: OffsetDateTime,
    text: String,
}

impl PendingReply {
    pub(crate) fn new(id: MessageId, timestamp: OffsetDateTime) -> Self {
        Self {
            id,
            timestamp,
            text: String::new(),
        }
    }

    /// The id the finished message will carry.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the reply was opened.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Appends a streamed fragment.
    pub fn push_str(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    fn finish(self, status: MessageStatus) -> Message {
        Message::new(self.id, Role::Model, self.text, self.timestamp).with_status(status)
    }
}

/////////////////////////////////////////////// TurnState //////////////////////////////////////////////

/// Whether a request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Ready for the next user turn.
    #[default]
    Idle,
    /// A reply is streaming; further submissions are ignored.
    InFlight {
        /// The reply being streamed.
        reply: MessageId,
    },
}

/// Why a submission was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text was empty or only whitespace.
    EmptyInput,
    /// Another reply is still streaming.
    InFlight,
}

/// The result of [`ChatSession::submit_user_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Nothing happened.
    Ignored(IgnoreReason),
    /// A turn ran to the end of its stream.
    Answered {
        /// Id of the reply message.
        reply: MessageId,
        /// How the stream ended.
        outcome: StreamOutcome,
    },
}

/// An open turn: the request to send and the reply to fill.
///
/// Returned by [`ChatSession::begin_turn`] for callers that drive the stream
/// themselves; hand the reply back with [`ChatSession::finish_turn`].
#[derive(Debug)]
pub struct Turn {
    /// Body to send to the backend.
    pub request: ChatRequest,
    /// Accumulator for the streamed answer.
    pub reply: PendingReply,
}

////////////////////////////////////////////// SessionStats ////////////////////////////////////////////

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The active language.
    pub language: LanguageCode,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Turns sent to the backend.
    pub total_turns: u64,
    /// Turns whose reply is a diagnostic.
    pub failed_turns: u64,
    /// Turns stopped before the backend finished.
    pub interrupted_turns: u64,
    /// Whether a reply is streaming right now.
    pub in_flight: bool,
}

/////////////////////////////////////////////// ChatSession ////////////////////////////////////////////

/// A single conversation thread.
pub struct ChatSession<B: ChatBackend = ChatClient> {
    backend: B,
    language: LanguageCode,
    messages: Vec<Message>,
    next_id: u64,
    state: TurnState,
    total_turns: u64,
    failed_turns: u64,
    interrupted_turns: u64,
}

impl ChatSession<ChatClient> {
    /// Creates a session talking to the backend named by `config`.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let client = ChatClient::with_options(config.backend_url.clone(), config.connect_timeout)?;
        Ok(Self::new(client, config.language))
    }
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates an empty session.
    pub fn new(backend: B, language: LanguageCode) -> Self {
        Self {
            backend,
            language,
            messages: Vec::new(),
            next_id: 1,
            state: TurnState::Idle,
            total_turns: 0,
            failed_turns: 0,
            interrupted_turns: 0,
        }
    }

    /// Greets the user in the active language if the conversation is empty.
    pub fn open(&mut self) {
        if self.messages.is_empty() {
            let id = self.allocate_id();
            let welcome = Message::new(id, Role::Model, self.language.welcome(), now());
            self.messages.push(welcome);
        }
    }

    /// Sends `text` as the next user turn and streams the answer into the
    /// conversation.
    ///
    /// Empty input, or input while another turn is streaming, is ignored
    /// without touching the conversation. Transport failures are not errors:
    /// the reply then holds the diagnostic and is marked failed.
    pub async fn submit_user_turn(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Submission {
        let started = Instant::now();
        let Turn { request, reply } = match self.begin_turn(text) {
            Ok(turn) => turn,
            Err(reason) => return Submission::Ignored(reason),
        };

        renderer.start_reply(&reply);
        let mut sink = ReplySink { reply, renderer };
        let outcome = self.backend.stream_request(&request, &mut sink).await;
        let ReplySink { reply, renderer } = sink;

        let id = reply.id();
        let message = self.complete(reply, outcome);
        renderer.finish_reply(message);
        SESSION_TURN_DURATION.add(started.elapsed().as_secs_f64());
        Submission::Answered { reply: id, outcome }
    }

    /// Opens a turn without streaming it.
    ///
    /// The user message is appended and the session goes in flight. The
    /// request's history is the conversation as it stood before this turn.
    pub fn begin_turn(&mut self, text: &str) -> std::result::Result<Turn, IgnoreReason> {
        if text.trim().is_empty() {
            SESSION_REJECTED_TURNS.click();
            return Err(IgnoreReason::EmptyInput);
        }
        if self.is_in_flight() {
            SESSION_REJECTED_TURNS.click();
            return Err(IgnoreReason::InFlight);
        }

        let request = ChatRequest::new(&self.messages, text, self.language);
        let user_id = self.allocate_id();
        self.messages
            .push(Message::new(user_id, Role::User, text, now()));
        let reply = PendingReply::new(self.allocate_id(), now());
        self.state = TurnState::InFlight { reply: reply.id() };
        SESSION_TURNS.click();
        self.total_turns += 1;
        Ok(Turn { request, reply })
    }

    /// Closes the turn opened by [`begin_turn`](Self::begin_turn).
    ///
    /// Fails if `reply` is not the reply of the turn in flight.
    pub fn finish_turn(&mut self, reply: PendingReply, outcome: StreamOutcome) -> Result<&Message> {
        match self.state {
            TurnState::InFlight { reply: expected } if expected == reply.id() => {
                Ok(self.complete(reply, outcome))
            }
            TurnState::InFlight { reply: expected } => Err(Error::validation(
                format!("reply {} does not belong to the turn in flight ({expected})", reply.id()),
                Some("reply".to_string()),
            )),
            TurnState::Idle => Err(Error::validation(
                format!("reply {} finished while no turn is in flight", reply.id()),
                Some("reply".to_string()),
            )),
        }
    }

    /// The conversation, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The conversation as it would be sent to the backend.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(HistoryEntry::from).collect()
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// The language replies are requested in.
    pub fn language(&self) -> LanguageCode {
        self.language
    }

    /// Switches the language for subsequent turns.
    pub fn set_language(&mut self, language: LanguageCode) {
        self.language = language;
    }

    /// Drops every message; [`open`](Self::open) greets again.
    ///
    /// Refused while a turn is in flight, so that its reply can still be
    /// finished. Message ids keep increasing across a clear.
    pub fn clear(&mut self) -> Result<()> {
        if let TurnState::InFlight { reply } = self.state {
            return Err(Error::validation(
                format!("cannot clear while reply {reply} is streaming"),
                None,
            ));
        }
        self.messages.clear();
        Ok(())
    }

    /// The current turn state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Returns true while a reply is streaming.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, TurnState::InFlight { .. })
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            language: self.language,
            message_count: self.message_count(),
            total_turns: self.total_turns,
            failed_turns: self.failed_turns,
            interrupted_turns: self.interrupted_turns,
            in_flight: self.is_in_flight(),
        }
    }

    fn complete(&mut self, reply: PendingReply, outcome: StreamOutcome) -> &Message {
        match outcome {
            StreamOutcome::Completed => {}
            StreamOutcome::Failed => self.failed_turns += 1,
            StreamOutcome::Cancelled => self.interrupted_turns += 1,
        }
        self.state = TurnState::Idle;
        let index = self.messages.len();
        self.messages.push(reply.finish(outcome.message_status()));
        &self.messages[index]
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

struct ReplySink<'a> {
    reply: PendingReply,
    renderer: &'a mut dyn Renderer,
}

impl ChunkSink for ReplySink<'_> {
    fn on_chunk(&mut self, text: &str) {
        self.reply.push_str(text);
        self.renderer.update_reply(&self.reply);
    }

    fn should_stop(&self) -> bool {
        self.renderer.should_interrupt()
    }

    fn stop_signal(&self) -> Option<CancellationToken> {
        self.renderer.interrupt_signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedBackend {
        chunks: Vec<&'static str>,
        outcome: StreamOutcome,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(chunks: Vec<&'static str>, outcome: StreamOutcome) -> Self {
            Self {
                chunks,
                outcome,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn stream_request(
            &self,
            request: &ChatRequest,
            sink: &mut dyn ChunkSink,
        ) -> StreamOutcome {
            self.requests.lock().unwrap().push(request.clone());
            for chunk in &self.chunks {
                if sink.should_stop() {
                    return StreamOutcome::Cancelled;
                }
                sink.on_chunk(chunk);
            }
            self.outcome
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        updates: Vec<String>,
        finished: Vec<(String, MessageStatus)>,
        interrupt_after: Option<usize>,
    }

    impl Renderer for RecordingRenderer {
        fn update_reply(&mut self, reply: &PendingReply) {
            self.updates.push(reply.text().to_string());
        }

        fn finish_reply(&mut self, message: &Message) {
            self.finished
                .push((message.text().to_string(), message.status()));
        }

        fn print_message(&mut self, _: &Message) {}

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, _: &str) {}

        fn should_interrupt(&self) -> bool {
            self.interrupt_after
                .is_some_and(|n| self.updates.len() >= n)
        }
    }

    fn session(chunks: Vec<&'static str>, outcome: StreamOutcome) -> ChatSession<ScriptedBackend> {
        ChatSession::new(ScriptedBackend::new(chunks, outcome), LanguageCode::Fr)
    }

    #[tokio::test]
    async fn chunks_accumulate_into_the_reply() {
        let mut session = session(vec!["Bon", "jour"], StreamOutcome::Completed);
        let mut renderer = RecordingRenderer::default();

        let submission = session.submit_user_turn("Salut", &mut renderer).await;

        let Submission::Answered { reply, outcome } = submission else {
            panic!("turn was ignored: {submission:?}");
        };
        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(renderer.updates, vec!["Bon", "Bonjour"]);
        assert_eq!(
            renderer.finished,
            vec![("Bonjour".to_string(), MessageStatus::Complete)]
        );

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), Role::User);
        assert_eq!(messages[0].text(), "Salut");
        assert_eq!(messages[1].id(), reply);
        assert_eq!(messages[1].role(), Role::Model);
        assert_eq!(messages[1].text(), "Bonjour");
        assert!(messages[0].id() < messages[1].id());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn history_excludes_the_current_turn() {
        let mut session = session(vec!["ok"], StreamOutcome::Completed);
        session.open();
        let mut renderer = RecordingRenderer::default();
        session.submit_user_turn("first", &mut renderer).await;
        session.submit_user_turn("second", &mut renderer).await;

        let requests = session.backend().requests();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].message, "first");
        assert_eq!(
            requests[0].history,
            vec![HistoryEntry::new(Role::Model, LanguageCode::Fr.welcome())]
        );

        assert_eq!(requests[1].message, "second");
        assert_eq!(
            requests[1].history,
            vec![
                HistoryEntry::new(Role::Model, LanguageCode::Fr.welcome()),
                HistoryEntry::new(Role::User, "first"),
                HistoryEntry::new(Role::Model, "ok"),
            ]
        );
        assert_eq!(session.history().len(), 5);
    }

    #[tokio::test]
    async fn failure_leaves_one_diagnostic_reply() {
        let diagnostic = LanguageCode::Fr.connection_diagnostic();
        let mut session = session(vec![diagnostic], StreamOutcome::Failed);
        let mut renderer = RecordingRenderer::default();

        let submission = session.submit_user_turn("Bonjour", &mut renderer).await;

        assert!(matches!(
            submission,
            Submission::Answered {
                outcome: StreamOutcome::Failed,
                ..
            }
        ));
        let reply = &session.messages()[1];
        assert_eq!(reply.text(), diagnostic);
        assert_eq!(reply.status(), MessageStatus::Failed);
        assert!(!session.is_in_flight());
        assert_eq!(session.stats().failed_turns, 1);
    }

    #[tokio::test]
    async fn empty_input_is_ignored() {
        let mut session = session(vec!["never"], StreamOutcome::Completed);
        let mut renderer = RecordingRenderer::default();

        for text in ["", "   ", "\n\t"] {
            let submission = session.submit_user_turn(text, &mut renderer).await;
            assert_eq!(submission, Submission::Ignored(IgnoreReason::EmptyInput));
        }
        assert!(session.messages().is_empty());
        assert!(session.backend().requests().is_empty());
        assert!(renderer.updates.is_empty());
    }

    #[tokio::test]
    async fn submitting_while_in_flight_has_no_effect() {
        let mut session = session(vec!["never"], StreamOutcome::Completed);
        let mut renderer = RecordingRenderer::default();

        let mut turn = session.begin_turn("first").unwrap();
        assert_eq!(session.message_count(), 1);
        assert_eq!(
            session.state(),
            TurnState::InFlight {
                reply: turn.reply.id()
            }
        );

        let submission = session.submit_user_turn("second", &mut renderer).await;
        assert_eq!(submission, Submission::Ignored(IgnoreReason::InFlight));
        assert_eq!(session.message_count(), 1);
        assert!(session.backend().requests().is_empty());
        assert_eq!(
            session.begin_turn("third").unwrap_err(),
            IgnoreReason::InFlight
        );

        turn.reply.push_str("réponse");
        let message = session
            .finish_turn(turn.reply, StreamOutcome::Completed)
            .unwrap();
        assert_eq!(message.text(), "réponse");
        assert!(!session.is_in_flight());
        assert_eq!(session.message_count(), 2);
    }

    #[test]
    fn finishing_a_stranger_reply_fails() {
        let mut session = session(vec![], StreamOutcome::Completed);
        let stranger = PendingReply::new(MessageId::new(99), now());
        assert!(
            session
                .finish_turn(stranger.clone(), StreamOutcome::Completed)
                .unwrap_err()
                .is_validation()
        );

        let _turn = session.begin_turn("hello").unwrap();
        assert!(
            session
                .finish_turn(stranger, StreamOutcome::Completed)
                .is_err()
        );
        assert!(session.is_in_flight());
    }

    #[tokio::test]
    async fn interrupt_keeps_the_partial_reply() {
        let mut session = session(vec!["Bon", "jour", "!"], StreamOutcome::Completed);
        let mut renderer = RecordingRenderer {
            interrupt_after: Some(1),
            ..RecordingRenderer::default()
        };

        let submission = session.submit_user_turn("Salut", &mut renderer).await;

        assert!(matches!(
            submission,
            Submission::Answered {
                outcome: StreamOutcome::Cancelled,
                ..
            }
        ));
        let reply = &session.messages()[1];
        assert_eq!(reply.text(), "Bon");
        assert_eq!(reply.status(), MessageStatus::Interrupted);
        assert_eq!(session.stats().interrupted_turns, 1);
    }

    #[test]
    fn open_greets_once() {
        let mut session = session(vec![], StreamOutcome::Completed);
        session.set_language(LanguageCode::Ar);
        session.open();
        session.open();
        assert_eq!(session.message_count(), 1);
        let welcome = &session.messages()[0];
        assert_eq!(welcome.role(), Role::Model);
        assert_eq!(welcome.text(), LanguageCode::Ar.welcome());
    }

    #[tokio::test]
    async fn language_follows_the_session() {
        let mut session = session(vec!["hi"], StreamOutcome::Completed);
        let mut renderer = RecordingRenderer::default();
        session.set_language(LanguageCode::En);
        session.submit_user_turn("hello", &mut renderer).await;
        assert_eq!(session.backend().requests()[0].language, LanguageCode::En);
        assert_eq!(session.language(), LanguageCode::En);
    }

    #[tokio::test]
    async fn clear_session() {
        let mut session = session(vec!["hi"], StreamOutcome::Completed);
        let mut renderer = RecordingRenderer::default();
        session.open();
        session.submit_user_turn("hello", &mut renderer).await;
        let last_id = session.messages()[2].id();

        session.clear().unwrap();
        assert_eq!(session.message_count(), 0);
        session.open();
        assert!(session.messages()[0].id() > last_id);

        let stats = session.stats();
        assert_eq!(stats.message_count, 1);
        assert_eq!(stats.total_turns, 1);
        assert!(!stats.in_flight);
    }

    #[test]
    fn clear_waits_for_the_turn_in_flight() {
        let mut session = session(vec![], StreamOutcome::Completed);
        session.open();
        let turn = session.begin_turn("Où dormir à Douz ?").unwrap();

        assert!(session.clear().unwrap_err().is_validation());
        assert_eq!(session.message_count(), 2);
        assert!(session.is_in_flight());

        let mut reply = turn.reply;
        reply.push_str("Au campement.");
        let message = session
            .finish_turn(reply, StreamOutcome::Completed)
            .unwrap();
        assert_eq!(message.text(), "Au campement.");
        assert_eq!(session.message_count(), 3);

        session.clear().unwrap();
        assert_eq!(session.message_count(), 0);
    }
}
