//! Audio capture capability and its adapters.
//!
//! The `AudioSource` trait is the seam between the session worker and any
//! concrete capture backend. The worker owns its source exclusively and is
//! the only thread that ever touches it, so the trait carries no `Send`
//! bound — backends wrapping thread-affine handles (`cpal::Stream` is
//! `!Send` on Windows/macOS) are opened *on* the worker thread via a
//! `Send` factory closure and never cross a thread boundary afterwards.

#[cfg(feature = "audio-cpal")]
pub mod mic;
pub mod resample;
pub mod wav;

#[cfg(feature = "audio-cpal")]
pub use mic::MicSource;
pub use wav::WavSource;

use std::time::Duration;

use crate::buffering::frame::AudioFrame;
use crate::error::Result;

/// Number of device samples drained per bounded read.
/// 2048 samples ≈ 128 ms at 16 kHz, ≈ 43 ms at 48 kHz.
pub const FRAME_SAMPLES: usize = 2048;

/// A stream of audio frames at a fixed session sample rate.
pub trait AudioSource {
    /// Read up to one frame, waiting at most `timeout`.
    ///
    /// Returns an empty frame when the timeout elapsed before any samples
    /// arrived — the worker treats that as "nothing yet" and re-checks its
    /// stop flag, which is what bounds shutdown latency.
    ///
    /// # Errors
    /// Any error is fatal to the session: device disconnects and permission
    /// loss are not retried mid-session.
    fn read(&mut self, timeout: Duration) -> Result<AudioFrame>;

    /// Rate (Hz) of the frames this source emits.
    fn sample_rate(&self) -> u32;
}
