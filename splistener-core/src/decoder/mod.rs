//! Speech decoder capability.
//!
//! `SpeechDecoder` decouples the session worker from any specific engine
//! (PocketSphinx, Vosk, an ONNX model, the bundled stub). `&mut self`
//! intentionally expresses that decoders are stateful — accumulated audio,
//! search lattices, utterance context. The worker thread owns its decoder
//! exclusively, so no `Send` bound is needed: decoders are constructed on
//! the worker thread by a `Send` factory closure.

pub mod stub;

pub use stub::StubDecoder;

use crate::buffering::frame::AudioFrame;
use crate::error::Result;

/// Contract for speech-decoding backends.
pub trait SpeechDecoder {
    /// Accumulate one frame of audio into the current utterance.
    ///
    /// # Errors
    /// Failures are per-cycle and non-fatal: the worker records them and
    /// keeps capturing.
    fn feed(&mut self, frame: &AudioFrame) -> Result<()>;

    /// The text recognized so far, or an empty string when nothing new has
    /// been decoded since the last non-empty hypothesis.
    ///
    /// Non-destructive with respect to the engine's utterance state; called
    /// once per decode cadence tick.
    ///
    /// # Errors
    /// Failures are per-cycle and non-fatal; the next tick retries.
    fn hypothesis(&mut self) -> Result<String>;
}
