//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Input devices deliver audio at their native rate (commonly 48 kHz);
//! speech decoders are trained at a fixed rate (usually 16 kHz).
//! `SampleRateConverter` bridges that gap on the worker thread, where
//! allocation is allowed. When the rates already match it is a passthrough
//! and no rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{ListenError, Result};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct SampleRateConverter {
    /// `None` when input rate == output rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Holds partial input between calls until a full block is available.
    pending: Vec<f32>,
    /// Input samples rubato consumes per process call.
    block_size: usize,
    /// Pre-allocated rubato output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl SampleRateConverter {
    /// Create a converter from `input_rate` to `output_rate` Hz, processing
    /// `block_size` input samples per rubato call.
    ///
    /// # Errors
    /// Returns `ListenError::AudioDevice` if rubato fails to initialise.
    pub fn new(input_rate: u32, output_rate: u32, block_size: usize) -> Result<Self> {
        if input_rate == output_rate {
            return Ok(Self {
                resampler: None,
                pending: Vec::new(),
                block_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio
            PolynomialDegree::Cubic,
            block_size,
            1, // mono
        )
        .map_err(|e| ListenError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        tracing::debug!(input_rate, output_rate, block_size, max_out, "resampler created");

        Ok(Self {
            resampler: Some(resampler),
            pending: Vec::new(),
            block_size,
            output_buf: vec![vec![0f32; max_out]],
        })
    }

    /// Convert incoming samples, returning output at the target rate.
    ///
    /// Input is accumulated internally until a full block is available, so
    /// the result may be empty; any remainder is kept for the next call.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);

        // Only whole blocks are handed to rubato; the tail stays pending.
        let whole = self.pending.len() - self.pending.len() % self.block_size;
        if whole == 0 {
            return Vec::new();
        }

        let mut out = Vec::with_capacity((whole / self.block_size) * self.output_buf[0].len());
        for block in self.pending[..whole].chunks_exact(self.block_size) {
            match resampler.process_into_buffer(&[block], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    out.extend_from_slice(&self.output_buf[0][..produced]);
                }
                Err(e) => error!("resampler process error: {e}"),
            }
        }
        self.pending.drain(..whole);
        out
    }

    /// `true` when no rate conversion takes place.
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
