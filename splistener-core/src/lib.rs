//! # splistener-core
//!
//! Continuous speech-listening SDK: owns the microphone, buffers audio,
//! triggers decoding at a fixed cadence, and publishes the latest result
//! and error to a single polling consumer.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → MicSource (cpal + SPSC ring) ─┐
//!                                            ├─ worker thread: bounded read
//! WAV file  → WavSource ─────────────────────┘     → SpeechDecoder::feed
//!                                                  → hypothesis every cadence
//!                                                        │
//!                                                  ResultChannel (text, error)
//!                                                        │
//!                                       caller: poll_text() / poll_error()
//! ```
//!
//! Polls never block and always return caller-owned strings. The decoding
//! engine itself is external — any backend implementing [`SpeechDecoder`]
//! plugs in via [`RecognitionSession::initialize_with`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod channel;
pub mod config;
pub mod decoder;
pub mod error;
pub mod guard;
pub mod session;

// Convenience re-exports for downstream crates
pub use audio::{AudioSource, WavSource};
pub use buffering::frame::AudioFrame;
pub use channel::ResultChannel;
pub use config::{SearchMode, SessionConfig};
pub use decoder::{SpeechDecoder, StubDecoder};
pub use error::{ListenError, Result};
pub use guard::{SessionLifecycleGuard, SessionRegistry};
pub use session::{DiagnosticsSnapshot, RecognitionSession, SessionState};

#[cfg(feature = "audio-cpal")]
pub use audio::MicSource;
