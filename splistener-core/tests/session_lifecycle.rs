//! End-to-end lifecycle tests driving `RecognitionSession` through scripted
//! audio sources and decoders.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use splistener_core::{
    AudioFrame, AudioSource, ListenError, RecognitionSession, Result, SessionConfig,
    SessionRegistry, SessionState, SpeechDecoder,
};

/// Source that replays a script, then acts like a quiet microphone.
struct ScriptedSource {
    script: VecDeque<Result<AudioFrame>>,
}

impl ScriptedSource {
    fn speech(frames: usize) -> Self {
        Self {
            script: (0..frames)
                .map(|_| Ok(AudioFrame::new(vec![0.1; 2048], 16_000)))
                .collect(),
        }
    }

    fn failing_after(frames: usize) -> Self {
        let mut script: VecDeque<Result<AudioFrame>> = (0..frames)
            .map(|_| Ok(AudioFrame::new(vec![0.1; 2048], 16_000)))
            .collect();
        script.push_back(Err(ListenError::AudioRead("microphone unplugged".into())));
        Self { script }
    }
}

impl AudioSource for ScriptedSource {
    fn read(&mut self, timeout: Duration) -> Result<AudioFrame> {
        match self.script.pop_front() {
            Some(item) => item,
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(1)));
                Ok(AudioFrame::empty(16_000))
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        16_000
    }
}

/// Decoder replaying scripted hypotheses, empty once exhausted.
struct ScriptedDecoder {
    hypotheses: Arc<Mutex<VecDeque<String>>>,
}

impl SpeechDecoder for ScriptedDecoder {
    fn feed(&mut self, _frame: &AudioFrame) -> Result<()> {
        Ok(())
    }

    fn hypothesis(&mut self) -> Result<String> {
        Ok(self.hypotheses.lock().pop_front().unwrap_or_default())
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        hmm_path: "models/en-us".into(),
        kws_path: None,
        lm_path: Some("models/en-us.lm".into()),
        dict_path: "models/en-us.dict".into(),
        sample_rate: 16_000,
        decode_interval_ms: 1,
    }
}

fn start_session(
    registry: &SessionRegistry,
    source: ScriptedSource,
    hypotheses: Vec<&str>,
) -> RecognitionSession {
    let mut session = RecognitionSession::with_registry(test_config(), registry.clone());
    let script: VecDeque<String> = hypotheses.into_iter().map(String::from).collect();
    let hypotheses = Arc::new(Mutex::new(script));
    session
        .initialize_with(
            move || Ok(Box::new(source) as Box<dyn AudioSource>),
            move || Ok(Box::new(ScriptedDecoder { hypotheses }) as Box<dyn SpeechDecoder>),
        )
        .expect("initialize session");
    session
}

fn poll_text_until(session: &RecognitionSession, timeout: Duration) -> String {
    let start = Instant::now();
    loop {
        let text = session.poll_text();
        if !text.is_empty() {
            return text;
        }
        if start.elapsed() >= timeout {
            panic!("timed out waiting for recognized text");
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn poll_error_until(session: &RecognitionSession, timeout: Duration) -> String {
    let start = Instant::now();
    loop {
        let message = session.poll_error();
        if !message.is_empty() {
            return message;
        }
        if start.elapsed() >= timeout {
            panic!("timed out waiting for an error message");
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn initialize_then_poll_then_shutdown() {
    let registry = SessionRegistry::new();
    let mut session = start_session(&registry, ScriptedSource::speech(2), vec!["hello world"]);
    assert_eq!(session.state(), SessionState::Listening);

    let text = poll_text_until(&session, Duration::from_secs(2));
    assert_eq!(text, "hello world");
    // Consume-once: nothing new since the last poll.
    assert_eq!(session.poll_text(), "");
    assert_eq!(session.poll_error(), "");

    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn second_initialize_on_same_session_is_rejected() {
    let registry = SessionRegistry::new();
    let mut session = start_session(&registry, ScriptedSource::speech(1), vec![]);

    let err = session
        .initialize_with(
            || Ok(Box::new(ScriptedSource::speech(0)) as Box<dyn AudioSource>),
            || {
                Ok(Box::new(ScriptedDecoder {
                    hypotheses: Arc::new(Mutex::new(VecDeque::new())),
                }) as Box<dyn SpeechDecoder>)
            },
        )
        .unwrap_err();
    assert!(matches!(err, ListenError::AlreadyInitialized));
    assert!(session.poll_error().contains("already active"));
    assert_eq!(session.state(), SessionState::Listening);

    session.shutdown();
}

#[test]
fn concurrent_second_session_is_rejected_until_shutdown() {
    let registry = SessionRegistry::new();
    let mut first = start_session(&registry, ScriptedSource::speech(1), vec![]);

    let mut second = RecognitionSession::with_registry(test_config(), registry.clone());
    let err = second
        .initialize_with(
            || Ok(Box::new(ScriptedSource::speech(0)) as Box<dyn AudioSource>),
            || {
                Ok(Box::new(ScriptedDecoder {
                    hypotheses: Arc::new(Mutex::new(VecDeque::new())),
                }) as Box<dyn SpeechDecoder>)
            },
        )
        .unwrap_err();
    assert!(matches!(err, ListenError::AlreadyInitialized));
    assert_eq!(second.state(), SessionState::Uninitialized);

    first.shutdown();

    // Slot freed: a fresh session may now start.
    let third = start_session(&registry, ScriptedSource::speech(1), vec![]);
    drop(third);
}

#[test]
fn shutdown_is_idempotent() {
    let registry = SessionRegistry::new();
    let mut session = start_session(&registry, ScriptedSource::speech(1), vec![]);

    session.shutdown();
    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.poll_error(), "");
}

#[test]
fn shutdown_before_initialize_is_safe() {
    let registry = SessionRegistry::new();
    let mut session = RecognitionSession::with_registry(test_config(), registry);
    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn fatal_audio_error_stops_session_and_frees_slot() {
    let registry = SessionRegistry::new();
    let mut session = start_session(&registry, ScriptedSource::failing_after(1), vec![]);

    let message = poll_error_until(&session, Duration::from_secs(2));
    assert!(message.contains("microphone unplugged"));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.poll_text(), "");
    assert_eq!(session.poll_text(), "");

    // Shutdown after a fatal stop succeeds without a new error.
    session.shutdown();
    assert_eq!(session.poll_error(), "");

    // The process slot was freed by the fatal stop.
    let replacement = start_session(&registry, ScriptedSource::speech(1), vec![]);
    drop(replacement);
}

#[test]
fn fatal_error_on_first_read_still_reports_stopped() {
    // The worker may hit a fatal read before initialize() even returns;
    // the Stopped transition must survive that interleaving, and any
    // observed error message implies the state is already Stopped.
    let registry = SessionRegistry::new();
    let mut session = start_session(&registry, ScriptedSource::failing_after(0), vec![]);

    let message = poll_error_until(&session, Duration::from_secs(2));
    assert!(message.contains("microphone unplugged"));
    assert_eq!(session.state(), SessionState::Stopped);

    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn initialize_failure_leaves_session_uninitialized() {
    let registry = SessionRegistry::new();
    let mut session = RecognitionSession::with_registry(test_config(), registry.clone());

    let err = session
        .initialize_with(
            || Ok(Box::new(ScriptedSource::speech(0)) as Box<dyn AudioSource>),
            || -> Result<Box<dyn SpeechDecoder>> {
                Err(ListenError::ModelNotFound {
                    path: "models/en-us".into(),
                })
            },
        )
        .unwrap_err();
    assert!(matches!(err, ListenError::ModelNotFound { .. }));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(session.poll_error().contains("not found"));

    // The slot was released; initialization can be retried on a new session.
    let retry = start_session(&registry, ScriptedSource::speech(1), vec![]);
    drop(retry);
}

#[test]
fn invalid_config_is_rejected_before_any_device_is_touched() {
    let registry = SessionRegistry::new();
    let mut config = test_config();
    config.lm_path = None; // no search mode selected
    let mut session = RecognitionSession::with_registry(config, registry);

    let err = session
        .initialize_with(
            || panic!("source factory must not run on config error"),
            || panic!("decoder factory must not run on config error"),
        )
        .unwrap_err();
    assert!(matches!(err, ListenError::Config(_)));
    assert!(!session.poll_error().is_empty());
}

#[test]
fn poll_text_before_initialize_records_not_initialized() {
    let registry = SessionRegistry::new();
    let session = RecognitionSession::with_registry(test_config(), registry);

    assert_eq!(session.poll_text(), "");
    assert!(session.poll_error().contains("not been initialized"));
}
