//! `StubDecoder` — placeholder backend that reports metadata without real
//! decoding.
//!
//! Used until a real engine is linked in: it validates model paths the way
//! a real `open` would, honors the keyword-list precedence rule, and emits
//! a deterministic hypothesis once a second of audio has accumulated, so
//! the full capture/poll loop can be exercised end-to-end.

use tracing::debug;

use crate::buffering::frame::AudioFrame;
use crate::config::{SearchMode, SessionConfig};
use crate::decoder::SpeechDecoder;
use crate::error::{ListenError, Result};

#[derive(Debug)]
pub struct StubDecoder {
    mode: SearchMode,
    sample_rate: u32,
    /// Samples fed since the last non-empty hypothesis.
    pending_samples: usize,
    utterance_count: u32,
}

impl StubDecoder {
    /// "Load" the model: resolve the search mode and check that the model
    /// paths exist, failing the way a real engine open would.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let mode = config.resolve_mode()?;

        for path in [&config.hmm_path, &config.dict_path] {
            if !path.exists() {
                return Err(ListenError::ModelNotFound { path: path.clone() });
            }
        }

        debug!(?mode, "stub decoder opened");
        Ok(Self {
            mode,
            sample_rate: config.sample_rate,
            pending_samples: 0,
            utterance_count: 0,
        })
    }

    /// The search mode this decoder was opened with.
    pub fn mode(&self) -> &SearchMode {
        &self.mode
    }
}

impl SpeechDecoder for StubDecoder {
    fn feed(&mut self, frame: &AudioFrame) -> Result<()> {
        self.pending_samples += frame.samples.len();
        Ok(())
    }

    fn hypothesis(&mut self) -> Result<String> {
        // One second of audio per stub utterance.
        if self.pending_samples < self.sample_rate as usize {
            return Ok(String::new());
        }
        self.utterance_count += 1;
        let text = format!(
            "[stub utterance {}: {} samples @ {} Hz]",
            self.utterance_count, self.pending_samples, self.sample_rate
        );
        self.pending_samples = 0;
        Ok(text)
    }
}
