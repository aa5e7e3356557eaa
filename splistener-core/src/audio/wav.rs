//! WAV-file audio source.
//!
//! Lets a session run against recorded audio instead of a live microphone:
//! offline transcription, reproducing bug reports, integration tests. The
//! file is decoded and rate-converted up front; `read` then hands out one
//! frame per call without pacing to real time. Exhausting the file surfaces
//! as a fatal read error, ending the session the same way a device loss
//! would.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::audio::resample::SampleRateConverter;
use crate::audio::{AudioSource, FRAME_SAMPLES};
use crate::buffering::frame::AudioFrame;
use crate::error::{ListenError, Result};

/// File-backed `AudioSource` emitting frames at the session rate.
#[derive(Debug)]
pub struct WavSource {
    samples: Vec<f32>,
    pos: usize,
    session_rate: u32,
}

impl WavSource {
    /// Decode `path`, mix to mono, and convert to `session_rate`.
    ///
    /// # Errors
    /// `ListenError::AudioDevice` when the file cannot be opened or its
    /// sample format is unsupported.
    pub fn open(path: impl AsRef<Path>, session_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| ListenError::AudioDevice(format!("{}: {e}", path.display())))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect()
            }
        }
        .map_err(|e| ListenError::AudioDevice(format!("{}: {e}", path.display())))?;

        let mono: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|fr| fr.iter().sum::<f32>() / channels as f32)
            .collect();

        let mut converter = SampleRateConverter::new(spec.sample_rate, session_rate, 1024)?;
        let samples = converter.process(&mono);

        info!(
            file = %path.display(),
            file_rate = spec.sample_rate,
            channels,
            session_rate,
            samples = samples.len(),
            "wav source loaded"
        );

        Ok(Self {
            samples,
            pos: 0,
            session_rate,
        })
    }
}

impl AudioSource for WavSource {
    fn read(&mut self, _timeout: Duration) -> Result<AudioFrame> {
        if self.pos >= self.samples.len() {
            return Err(ListenError::AudioRead("end of stream".into()));
        }
        let end = (self.pos + FRAME_SAMPLES).min(self.samples.len());
        let frame = AudioFrame::new(self.samples[self.pos..end].to_vec(), self.session_rate);
        self.pos = end;
        Ok(frame)
    }

    fn sample_rate(&self) -> u32 {
        self.session_rate
    }
}
