//! Dictation support.
//!
//! Speech recognition is a host capability that may or may not exist. A
//! [`SpeechProvider`] reports what the host offers as an [`Availability`],
//! and [`Dictation`] turns that into the behaviour of a microphone button:
//! toggling, feeding transcripts into the input line, and telling the user
//! when dictation cannot be used.

use std::fmt;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};
use crate::types::LanguageCode;

/// Why a recognition session ended in error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// The user or the host refused microphone access.
    NotAllowed,
    /// Nothing was said.
    NoSpeech,
    /// No microphone could be opened.
    AudioCapture,
    /// The recognizer needed the network and could not reach it.
    Network,
    /// Recognition was stopped before a result.
    Aborted,
    /// Any other host-specific code.
    Other(String),
}

impl SpeechErrorKind {
    /// Maps a host error code such as `not-allowed` to a kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => SpeechErrorKind::NotAllowed,
            "no-speech" => SpeechErrorKind::NoSpeech,
            "audio-capture" => SpeechErrorKind::AudioCapture,
            "network" => SpeechErrorKind::Network,
            "aborted" => SpeechErrorKind::Aborted,
            other => SpeechErrorKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechErrorKind::NotAllowed => write!(f, "not-allowed"),
            SpeechErrorKind::NoSpeech => write!(f, "no-speech"),
            SpeechErrorKind::AudioCapture => write!(f, "audio-capture"),
            SpeechErrorKind::Network => write!(f, "network"),
            SpeechErrorKind::Aborted => write!(f, "aborted"),
            SpeechErrorKind::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Something a recognition session reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The microphone is open.
    Started,
    /// A final transcript.
    Result(String),
    /// The session is over.
    Ended,
    /// The session failed.
    Error(SpeechErrorKind),
}

/// A host speech recognizer.
pub trait SpeechCapability: Send {
    /// Starts one recognition session for `locale` (e.g. `fr-FR`).
    ///
    /// Events are delivered through `events` until [`SpeechEvent::Ended`].
    fn start(&mut self, locale: &str, events: UnboundedSender<SpeechEvent>) -> Result<()>;

    /// Stops the running session, if any.
    fn stop(&mut self);
}

/// What a host offers for dictation.
pub enum Availability {
    /// A recognizer is available.
    Supported(Box<dyn SpeechCapability>),
    /// The host has no speech recognition.
    Unsupported,
}

impl Availability {
    /// Returns true if a recognizer is available.
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Supported(_))
    }
}

impl fmt::Debug for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Supported(_) => write!(f, "Supported"),
            Availability::Unsupported => write!(f, "Unsupported"),
        }
    }
}

/// Probes the host for speech recognition.
pub trait SpeechProvider {
    /// Reports what the host offers.
    fn detect(&self) -> Availability;
}

/// Provider for hosts without speech recognition, such as a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSpeech;

impl SpeechProvider for UnsupportedSpeech {
    fn detect(&self) -> Availability {
        Availability::Unsupported
    }
}

/// The microphone button.
pub struct Dictation {
    capability: Option<Box<dyn SpeechCapability>>,
    language: LanguageCode,
    listening: bool,
    told_unsupported: bool,
    events_tx: UnboundedSender<SpeechEvent>,
    events_rx: UnboundedReceiver<SpeechEvent>,
}

impl Dictation {
    /// Creates a dictation control for whatever `provider` finds.
    pub fn new(provider: &dyn SpeechProvider) -> Self {
        let capability = match provider.detect() {
            Availability::Supported(capability) => Some(capability),
            Availability::Unsupported => None,
        };
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            capability,
            language: LanguageCode::default(),
            listening: false,
            told_unsupported: false,
            events_tx,
            events_rx,
        }
    }

    /// Returns true if the host can dictate.
    pub fn is_available(&self) -> bool {
        self.capability.is_some()
    }

    /// Returns true while the microphone is open.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Starts listening in `language`, or stops if already listening.
    ///
    /// Returns a notice for the user when dictation cannot start. A host
    /// without speech recognition is reported once; later toggles do nothing.
    pub fn toggle(&mut self, language: LanguageCode) -> Option<String> {
        self.language = language;
        if self.listening {
            self.stop();
            return None;
        }

        match self.start(language) {
            Ok(()) => None,
            Err(err) if err.is_unsupported() => {
                if self.told_unsupported {
                    return None;
                }
                self.told_unsupported = true;
                Some(language.speech_unsupported_notice().to_string())
            }
            Err(err) => Some(err.to_string()),
        }
    }

    /// Opens the microphone for `language`.
    ///
    /// Fails with [`Error::Unsupported`] on a host without speech recognition.
    /// Listening begins with the recognizer's [`SpeechEvent::Started`].
    pub fn start(&mut self, language: LanguageCode) -> Result<()> {
        self.language = language;
        let capability = self
            .capability
            .as_mut()
            .ok_or_else(|| Error::unsupported("speech recognition"))?;
        capability.start(language.speech_locale(), self.events_tx.clone())
    }

    /// Closes the microphone.
    pub fn stop(&mut self) {
        if let Some(capability) = self.capability.as_mut() {
            capability.stop();
        }
        self.listening = false;
    }

    /// Applies one recognizer event, appending any transcript to `input`.
    ///
    /// Returns a notice when the user has to act, namely when microphone
    /// access was refused.
    pub fn handle(&mut self, event: SpeechEvent, input: &mut String) -> Option<String> {
        match event {
            SpeechEvent::Started => {
                self.listening = true;
                None
            }
            SpeechEvent::Result(transcript) => {
                let transcript = transcript.trim();
                if !transcript.is_empty() {
                    if !input.is_empty() {
                        input.push(' ');
                    }
                    input.push_str(transcript);
                }
                None
            }
            SpeechEvent::Ended => {
                self.listening = false;
                None
            }
            SpeechEvent::Error(kind) => {
                self.listening = false;
                match kind {
                    SpeechErrorKind::NotAllowed => {
                        Some(self.language.microphone_denied_notice().to_string())
                    }
                    _ => None,
                }
            }
        }
    }

    /// Applies every event received so far without waiting.
    pub fn poll_events(&mut self, input: &mut String) -> Vec<String> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(notice) = self.handle(event, input) {
                notices.push(notice);
            }
        }
        notices
    }

    /// Waits for the next recognizer event.
    pub async fn next_event(&mut self) -> Option<SpeechEvent> {
        self.events_rx.recv().await
    }
}

impl fmt::Debug for Dictation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictation")
            .field("available", &self.is_available())
            .field("language", &self.language)
            .field("listening", &self.listening)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeRecognizer {
        calls: Arc<Mutex<Vec<String>>>,
        script: Vec<SpeechEvent>,
        refusal: Option<Error>,
    }

    impl SpeechCapability for FakeRecognizer {
        fn start(&mut self, locale: &str, events: UnboundedSender<SpeechEvent>) -> Result<()> {
            self.calls.lock().unwrap().push(format!("start {locale}"));
            if let Some(err) = &self.refusal {
                return Err(err.clone());
            }
            for event in &self.script {
                let _ = events.send(event.clone());
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().push("stop".to_string());
        }
    }

    impl SpeechProvider for FakeRecognizer {
        fn detect(&self) -> Availability {
            Availability::Supported(Box::new(self.clone()))
        }
    }

    #[test]
    fn unsupported_host_is_reported_once() {
        let mut dictation = Dictation::new(&UnsupportedSpeech);
        assert!(!dictation.is_available());
        assert_eq!(
            dictation.toggle(LanguageCode::Fr).as_deref(),
            Some("Votre navigateur ne supporte pas la reconnaissance vocale.")
        );
        assert_eq!(dictation.toggle(LanguageCode::Fr), None);
        assert_eq!(dictation.toggle(LanguageCode::En), None);
        assert!(!dictation.is_listening());
    }

    #[test]
    fn toggle_starts_with_the_language_locale_then_stops() {
        let recognizer = FakeRecognizer {
            script: vec![SpeechEvent::Started],
            ..FakeRecognizer::default()
        };
        let mut dictation = Dictation::new(&recognizer);
        let mut input = String::new();

        assert_eq!(dictation.toggle(LanguageCode::Ar), None);
        assert!(dictation.poll_events(&mut input).is_empty());
        assert!(dictation.is_listening());

        assert_eq!(dictation.toggle(LanguageCode::Ar), None);
        assert!(!dictation.is_listening());
        assert_eq!(
            *recognizer.calls.lock().unwrap(),
            vec!["start ar-TN".to_string(), "stop".to_string()]
        );
    }

    #[test]
    fn transcripts_extend_the_input() {
        let recognizer = FakeRecognizer {
            script: vec![
                SpeechEvent::Started,
                SpeechEvent::Result("plages de Djerba".to_string()),
                SpeechEvent::Ended,
            ],
            ..FakeRecognizer::default()
        };
        let mut dictation = Dictation::new(&recognizer);

        let mut input = "Je cherche des".to_string();
        dictation.toggle(LanguageCode::Fr);
        dictation.poll_events(&mut input);
        assert_eq!(input, "Je cherche des plages de Djerba");
        assert!(!dictation.is_listening());

        let mut empty = String::new();
        dictation.handle(SpeechEvent::Result(" Tozeur ".to_string()), &mut empty);
        assert_eq!(empty, "Tozeur");
    }

    #[test]
    fn refused_microphone_is_explained() {
        let recognizer = FakeRecognizer {
            script: vec![
                SpeechEvent::Started,
                SpeechEvent::Error(SpeechErrorKind::from_code("not-allowed")),
            ],
            ..FakeRecognizer::default()
        };
        let mut dictation = Dictation::new(&recognizer);
        let mut input = String::new();

        dictation.toggle(LanguageCode::En);
        let notices = dictation.poll_events(&mut input);
        assert_eq!(
            notices,
            vec![LanguageCode::En.microphone_denied_notice().to_string()]
        );
        assert!(!dictation.is_listening());
        assert!(input.is_empty());
    }

    #[test]
    fn other_errors_just_stop_listening() {
        let mut dictation = Dictation::new(&FakeRecognizer::default());
        let mut input = String::new();
        dictation.handle(SpeechEvent::Started, &mut input);
        assert!(dictation.is_listening());
        let notice = dictation.handle(
            SpeechEvent::Error(SpeechErrorKind::from_code("no-speech")),
            &mut input,
        );
        assert_eq!(notice, None);
        assert!(!dictation.is_listening());
    }

    #[test]
    fn failed_start_is_reported() {
        let recognizer = FakeRecognizer {
            refusal: Some(Error::validation("microphone busy", None)),
            ..FakeRecognizer::default()
        };
        let mut dictation = Dictation::new(&recognizer);
        let notice = dictation.toggle(LanguageCode::Fr).unwrap();
        assert!(notice.contains("microphone"));
        assert!(!dictation.is_listening());
    }

    #[test]
    fn start_without_recognizer_is_unsupported() {
        let mut dictation = Dictation::new(&UnsupportedSpeech);
        let err = dictation.start(LanguageCode::Ar).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "speech recognition is not available on this host"
        );
    }

    #[test]
    fn recognizer_that_turns_out_unsupported_gets_the_notice() {
        let recognizer = FakeRecognizer {
            refusal: Some(Error::unsupported("microphone")),
            ..FakeRecognizer::default()
        };
        let mut dictation = Dictation::new(&recognizer);
        assert_eq!(
            dictation.toggle(LanguageCode::En).as_deref(),
            Some(LanguageCode::En.speech_unsupported_notice())
        );
        assert_eq!(dictation.toggle(LanguageCode::En), None);
    }

    #[test]
    fn error_codes_round_trip_through_display() {
        for code in ["not-allowed", "no-speech", "audio-capture", "network", "aborted", "bad-grammar"] {
            assert_eq!(SpeechErrorKind::from_code(code).to_string(), code);
        }
        assert_eq!(
            SpeechErrorKind::from_code("service-not-allowed"),
            SpeechErrorKind::NotAllowed
        );
    }

    #[tokio::test]
    async fn events_can_be_awaited() {
        let recognizer = FakeRecognizer {
            script: vec![SpeechEvent::Result("Kairouan".to_string())],
            ..FakeRecognizer::default()
        };
        let mut dictation = Dictation::new(&recognizer);
        dictation.toggle(LanguageCode::Fr);
        assert_eq!(
            dictation.next_event().await,
            Some(SpeechEvent::Result("Kairouan".to_string()))
        );
    }
}
