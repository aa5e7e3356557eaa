//! `RecognitionSession` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! RecognitionSession::new(config)        state = Uninitialized
//!     └─► initialize()                   source + decoder opened on the
//!                                        worker thread, loop spawned,
//!                                        state = Listening
//!         └─► poll_text()/poll_error()   consume-once, never block
//!             └─► shutdown()             stop flag + join, state = Stopped
//! ```
//!
//! `Stopped` is terminal: a session object is single-use, and at most one
//! session per process may be `Listening` (enforced by the registry guard).
//!
//! ## Threading
//!
//! The audio source and decoder are opened *inside* the worker thread and
//! never cross a thread boundary afterwards — cpal streams are thread-affine
//! on Windows/macOS. A bounded crossbeam channel hands the open result back
//! to the `initialize` caller, which blocks only until the devices are
//! confirmed open (or failed).

pub mod worker;

pub use worker::{DiagnosticsSnapshot, SessionDiagnostics};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::audio::AudioSource;
use crate::channel::ResultChannel;
use crate::config::SessionConfig;
use crate::decoder::SpeechDecoder;
use crate::error::{ListenError, Result};
use crate::guard::{SessionLifecycleGuard, SessionRegistry};

#[cfg(feature = "audio-cpal")]
use crate::audio::MicSource;
use crate::decoder::StubDecoder;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but `initialize` has not succeeded yet.
    Uninitialized,
    /// Capture and decoding are active.
    Listening,
    /// Terminal: stopped by `shutdown` or a fatal device failure.
    Stopped,
}

/// One end-to-end capture/decode session, polled by a single consumer.
pub struct RecognitionSession {
    config: SessionConfig,
    registry: SessionRegistry,
    state: Arc<Mutex<SessionState>>,
    /// `true` while the capture/decode loop should keep running.
    running: Arc<AtomicBool>,
    channel: Arc<ResultChannel>,
    diagnostics: Arc<SessionDiagnostics>,
    worker: Option<JoinHandle<()>>,
    guard: Option<SessionLifecycleGuard>,
}

impl RecognitionSession {
    /// Create a session against the process-wide registry. Does not touch
    /// any device — call `initialize` to start listening.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(config, SessionRegistry::global())
    }

    /// Create a session against an explicit registry (tests, embedders with
    /// their own session scope).
    pub fn with_registry(config: SessionConfig, registry: SessionRegistry) -> Self {
        Self {
            config,
            registry,
            state: Arc::new(Mutex::new(SessionState::Uninitialized)),
            running: Arc::new(AtomicBool::new(false)),
            channel: Arc::new(ResultChannel::new()),
            diagnostics: Arc::new(SessionDiagnostics::default()),
            worker: None,
            guard: None,
        }
    }

    /// Start listening with the default backends: the system microphone and
    /// the bundled stub decoder.
    ///
    /// Blocks until the device and decoder are confirmed open, then returns
    /// while the capture/decode loop runs in the background.
    ///
    /// # Errors
    /// - `ListenError::AlreadyInitialized` when this session already ran or
    ///   another session holds the active slot.
    /// - `ListenError::Config` on invalid configuration.
    /// - Device/model acquisition errors from the backends.
    ///
    /// Every failure is also recorded for `poll_error`.
    #[cfg(feature = "audio-cpal")]
    pub fn initialize(&mut self) -> Result<()> {
        let sample_rate = self.config.sample_rate;
        let decoder_config = self.config.clone();
        self.initialize_with(
            move || MicSource::open(sample_rate).map(|s| Box::new(s) as Box<dyn AudioSource>),
            move || StubDecoder::open(&decoder_config).map(|d| Box::new(d) as Box<dyn SpeechDecoder>),
        )
    }

    #[cfg(not(feature = "audio-cpal"))]
    pub fn initialize(&mut self) -> Result<()> {
        let decoder_config = self.config.clone();
        self.initialize_with(
            || -> Result<Box<dyn AudioSource>> {
                Err(ListenError::AudioDevice(
                    "compiled without the audio-cpal feature".into(),
                ))
            },
            move || StubDecoder::open(&decoder_config).map(|d| Box::new(d) as Box<dyn SpeechDecoder>),
        )
    }

    /// Start listening with caller-supplied backends.
    ///
    /// Both factories run on the worker thread, so backends holding
    /// thread-affine handles never migrate.
    pub fn initialize_with<S, D>(&mut self, open_source: S, open_decoder: D) -> Result<()>
    where
        S: FnOnce() -> Result<Box<dyn AudioSource>> + Send + 'static,
        D: FnOnce() -> Result<Box<dyn SpeechDecoder>> + Send + 'static,
    {
        if *self.state.lock() != SessionState::Uninitialized {
            return Err(self.record(ListenError::AlreadyInitialized));
        }

        let mode = match self.config.resolve_mode() {
            Ok(mode) => mode,
            Err(e) => return Err(self.record(e)),
        };

        let guard = match self.registry.acquire() {
            Ok(guard) => guard,
            Err(e) => return Err(self.record(e)),
        };

        info!(?mode, sample_rate = self.config.sample_rate, "initializing session");
        self.running.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let ctx_channel = Arc::clone(&self.channel);
        let ctx_running = Arc::clone(&self.running);
        let ctx_state = Arc::clone(&self.state);
        let ctx_guard = guard.clone();
        let ctx_diagnostics = Arc::clone(&self.diagnostics);
        let decode_interval = Duration::from_millis(self.config.decode_interval_ms);

        let spawned = std::thread::Builder::new()
            .name("splistener-worker".into())
            .spawn(move || {
                // Decoder first: model loading is the slow, likely-to-fail
                // step and must not leave an open stream behind.
                let decoder = match open_decoder() {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let source = match open_source() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // The worker owns every state transition from here on; if
                // the very first read fails, Stopped must not be raced by
                // the initialize caller writing Listening afterwards.
                *ctx_state.lock() = SessionState::Listening;
                let _ = ready_tx.send(Ok(()));

                worker::run(worker::WorkerContext {
                    source,
                    decoder,
                    channel: ctx_channel,
                    running: ctx_running,
                    state: ctx_state,
                    guard: ctx_guard,
                    decode_interval,
                    diagnostics: ctx_diagnostics,
                });

                // Source and decoder drop here, on the thread that made them.
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                guard.release();
                return Err(self.record(ListenError::Io(e)));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                // State is already Listening (or Stopped, if the first read
                // failed in the meantime) — written by the worker.
                self.worker = Some(handle);
                self.guard = Some(guard);
                info!("session listening");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                guard.release();
                Err(self.record(e))
            }
            Err(_) => {
                // Channel closed before a message was sent — worker panicked
                // while opening.
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                guard.release();
                Err(self.record(ListenError::Other(anyhow::anyhow!(
                    "worker thread died during startup"
                ))))
            }
        }
    }

    /// The last recognized text, cleared on read. Empty when nothing new was
    /// decoded since the previous call (or before `initialize` succeeds, in
    /// which case a `NotInitialized` error is recorded). Never blocks.
    pub fn poll_text(&self) -> String {
        if *self.state.lock() == SessionState::Uninitialized {
            self.channel.publish_error(ListenError::NotInitialized.to_string());
            return String::new();
        }
        self.channel.take_text()
    }

    /// The last recorded error message, cleared on read. Empty when none is
    /// pending. Never blocks.
    pub fn poll_error(&self) -> String {
        self.channel.take_error()
    }

    /// Stop the capture/decode loop, wait for it to exit, and release the
    /// device, the decoder, and the active-session slot. Idempotent and safe
    /// to call even if `initialize` never succeeded.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
        *self.state.lock() = SessionState::Stopped;
    }

    /// Current lifecycle state (snapshot).
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the loop counters for observability.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Record a failure for `poll_error` and hand it back to the caller.
    fn record(&self, e: ListenError) -> ListenError {
        self.channel.publish_error(e.to_string());
        e
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
