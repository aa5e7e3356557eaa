//! The capture/decode loop, run on the dedicated worker thread.
//!
//! ## Per iteration
//!
//! ```text
//! 1. Check the stop flag
//! 2. Bounded read from the AudioSource (the only suspension point)
//!    └─ read failure is fatal: state = Stopped, record error, exit
//! 3. Feed the frame to the decoder (feed failure recorded, non-fatal)
//! 4. When the decode cadence elapsed: request a hypothesis
//!    └─ non-empty → overwrite the text slot (most-recent-wins)
//!    └─ decode failure recorded, loop continues
//! ```
//!
//! Shutdown latency is bounded by one read timeout plus one decode call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::audio::AudioSource;
use crate::channel::ResultChannel;
use crate::decoder::SpeechDecoder;
use crate::guard::SessionLifecycleGuard;
use crate::session::SessionState;

/// Upper bound on one `AudioSource::read` call.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Relaxed counters tracking loop progress, shared with the session for
/// observability.
#[derive(Default)]
pub struct SessionDiagnostics {
    pub frames_in: AtomicUsize,
    pub samples_in: AtomicUsize,
    pub feed_errors: AtomicUsize,
    pub decode_calls: AtomicUsize,
    pub decode_errors: AtomicUsize,
    pub results_published: AtomicUsize,
}

impl SessionDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            samples_in: self.samples_in.load(Ordering::Relaxed),
            feed_errors: self.feed_errors.load(Ordering::Relaxed),
            decode_calls: self.decode_calls.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            results_published: self.results_published.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub samples_in: usize,
    pub feed_errors: usize,
    pub decode_calls: usize,
    pub decode_errors: usize,
    pub results_published: usize,
}

/// Everything the loop needs, passed as one struct so the spawn closure
/// stays tidy.
pub(crate) struct WorkerContext {
    pub source: Box<dyn AudioSource>,
    pub decoder: Box<dyn SpeechDecoder>,
    pub channel: Arc<ResultChannel>,
    pub running: Arc<AtomicBool>,
    pub state: Arc<Mutex<SessionState>>,
    pub guard: SessionLifecycleGuard,
    pub decode_interval: Duration,
    pub diagnostics: Arc<SessionDiagnostics>,
}

/// Run the capture/decode loop until the stop flag clears or a fatal read
/// failure ends the session.
pub(crate) fn run(mut ctx: WorkerContext) {
    info!("capture/decode loop started");
    let mut last_decode = Instant::now();

    loop {
        // ── 1. Stop flag ─────────────────────────────────────────────────
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        // ── 2. Bounded read ──────────────────────────────────────────────
        let frame = match ctx.source.read(READ_TIMEOUT) {
            Ok(frame) => frame,
            Err(e) => {
                // Device loss is not retried: stop, then surface. State is
                // stored first so a poller that observes the error always
                // observes Stopped as well.
                error!(error = %e, "audio read failed, stopping session");
                *ctx.state.lock() = SessionState::Stopped;
                ctx.running.store(false, Ordering::SeqCst);
                ctx.guard.release();
                ctx.channel.publish_error(e.to_string());
                break;
            }
        };

        // ── 3. Feed the decoder ──────────────────────────────────────────
        if !frame.is_empty() {
            ctx.diagnostics.frames_in.fetch_add(1, Ordering::Relaxed);
            ctx.diagnostics
                .samples_in
                .fetch_add(frame.samples.len(), Ordering::Relaxed);

            if let Err(e) = ctx.decoder.feed(&frame) {
                ctx.diagnostics.feed_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "decoder rejected frame, continuing");
                ctx.channel.publish_error(e.to_string());
            }
        }

        // ── 4. Cadence tick ──────────────────────────────────────────────
        if last_decode.elapsed() >= ctx.decode_interval {
            last_decode = Instant::now();
            ctx.diagnostics.decode_calls.fetch_add(1, Ordering::Relaxed);

            match ctx.decoder.hypothesis() {
                Ok(text) if !text.is_empty() => {
                    ctx.diagnostics
                        .results_published
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(len = text.len(), "hypothesis published");
                    ctx.channel.publish_text(text);
                }
                Ok(_) => {}
                Err(e) => {
                    // Recoverable: capture continues, the next tick retries.
                    ctx.diagnostics.decode_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "decode failed, continuing");
                    ctx.channel.publish_error(e.to_string());
                }
            }
        }
    }

    let snap = ctx.diagnostics.snapshot();
    info!(
        frames_in = snap.frames_in,
        samples_in = snap.samples_in,
        feed_errors = snap.feed_errors,
        decode_calls = snap.decode_calls,
        decode_errors = snap.decode_errors,
        results_published = snap.results_published,
        "capture/decode loop stopped"
    );
}
