//! Microphone capture via cpal.
//!
//! The cpal input callback runs on an OS audio thread at elevated priority
//! and must not allocate, block, or perform I/O — apart from the one-time
//! growth of the channel mixdown scratch buffer it only writes into the
//! lock-free SPSC ring.
//!
//! `cpal::Stream` is `!Send` on Windows/macOS, so a `MicSource` must be
//! created and dropped on the session worker thread. `RecognitionSession`
//! arranges this by running the source factory inside the worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::audio::resample::SampleRateConverter;
use crate::audio::{AudioSource, FRAME_SAMPLES};
use crate::buffering::{create_audio_ring, AudioConsumer, AudioProducer, Consumer, Producer};
use crate::buffering::frame::AudioFrame;
use crate::error::{ListenError, Result};

/// Poll interval while waiting for the ring to fill during a bounded read.
const READ_POLL: Duration = Duration::from_millis(2);

/// Microphone-backed `AudioSource` emitting frames at the session rate.
///
/// **Not `Send`** — holds the cpal stream, which is bound to its creation
/// thread on Windows/macOS.
pub struct MicSource {
    /// Kept alive so capture continues; dropping it releases the device.
    _stream: Stream,
    consumer: AudioConsumer,
    converter: SampleRateConverter,
    /// Scratch for raw device-rate samples drained per read.
    raw: Vec<f32>,
    session_rate: u32,
    /// Stream errors latched by the cpal error callback, surfaced by `read`.
    stream_error: Arc<Mutex<Option<String>>>,
}

impl MicSource {
    /// Open the system default input device and start capturing.
    ///
    /// # Errors
    /// `ListenError::NoDefaultInputDevice` when no microphone is available,
    /// `ListenError::AudioDevice` when cpal fails to configure or start the
    /// stream or the device reports an unsupported sample format.
    pub fn open(session_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(ListenError::NoDefaultInputDevice)?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| ListenError::AudioDevice(e.to_string()))?;
        let device_rate = supported.sample_rate().0;
        let channels = supported.channels();

        info!(device_rate, channels, session_rate, "audio config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = create_audio_ring();
        let stream_error = Arc::new(Mutex::new(None::<String>));
        let err_slot = Arc::clone(&stream_error);
        let err_cb = move |err: cpal::StreamError| {
            // Latched once; read() turns it into a fatal AudioRead.
            let mut slot = err_slot.lock();
            if slot.is_none() {
                *slot = Some(err.to_string());
            }
        };

        let ch = channels as usize;
        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                let mut writer = RingWriter::new(producer, ch);
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _info| writer.write(data, |s| s),
                    err_cb,
                    None,
                )
            }
            SampleFormat::I16 => {
                let mut writer = RingWriter::new(producer, ch);
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _info| writer.write(data, |s| s as f32 / 32_768.0),
                    err_cb,
                    None,
                )
            }
            fmt => {
                return Err(ListenError::AudioDevice(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| ListenError::AudioDevice(e.to_string()))?;

        stream
            .play()
            .map_err(|e| ListenError::AudioDevice(e.to_string()))?;

        let converter = SampleRateConverter::new(device_rate, session_rate, FRAME_SAMPLES)?;

        Ok(Self {
            _stream: stream,
            consumer,
            converter,
            raw: vec![0f32; FRAME_SAMPLES],
            session_rate,
            stream_error,
        })
    }
}

impl AudioSource for MicSource {
    fn read(&mut self, timeout: Duration) -> Result<AudioFrame> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0usize;

        while filled < FRAME_SAMPLES {
            if let Some(msg) = self.stream_error.lock().take() {
                return Err(ListenError::AudioRead(msg));
            }
            filled += self.consumer.pop_slice(&mut self.raw[filled..]);
            if filled >= FRAME_SAMPLES || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(READ_POLL);
        }

        // May be empty while the converter accumulates a full block.
        let samples = self.converter.process(&self.raw[..filled]);
        Ok(AudioFrame::new(samples, self.session_rate))
    }

    fn sample_rate(&self) -> u32 {
        self.session_rate
    }
}

/// Channel mixdown writer shared by the per-format cpal callbacks.
struct RingWriter {
    producer: AudioProducer,
    channels: usize,
    mix: Vec<f32>,
}

impl RingWriter {
    fn new(producer: AudioProducer, channels: usize) -> Self {
        Self {
            producer,
            channels,
            mix: Vec::new(),
        }
    }

    /// Mix interleaved input down to mono f32 and push it into the ring.
    fn write<S: Copy>(&mut self, data: &[S], to_f32: impl Fn(S) -> f32) {
        let frames = data.len() / self.channels;
        self.mix.resize(frames, 0.0);
        for f in 0..frames {
            let base = f * self.channels;
            let mut sum = 0f32;
            for c in 0..self.channels {
                sum += to_f32(data[base + c]);
            }
            self.mix[f] = sum / self.channels as f32;
        }
        let written = self.producer.push_slice(&self.mix);
        if written < frames {
            warn!("ring buffer full: dropped {} frames", frames - written);
        }
    }
}
