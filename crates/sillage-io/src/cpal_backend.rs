//! cpal-based audio backend implementation.
//!
//! cpal exposes input and output as two independent streams, each with its
//! own callback. [`CpalBackend`] joins them into one duplex callback:
//!
//! ```text
//! input callback ──push──▶ rtrb ring (f32) ──pop──▶ output callback
//!                                                     │
//!                                                     ▼
//!                                         DuplexCallback(input, output, info)
//! ```
//!
//! The ring is sized for several blocks and primed with one block of silence,
//! which absorbs scheduling jitter between the two callbacks at the cost of one
//! block of latency. Both ends are wait-free; ring overflow and underflow are
//! reported to the callback as [`StreamStatus`] flags instead of blocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cpal::Host;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::backend::{AudioBackend, DuplexCallback, ErrorCallback, StreamHandle};
use crate::stream::{find_input_device, find_output_device};
use crate::{AudioDevice, CallbackInfo, Error, Result, StreamConfig, StreamStatus};

/// Capture ring capacity, in blocks.
const RING_BLOCKS: usize = 4;

/// Input-callback half of the duplex bridge.
struct CaptureSide {
    producer: Producer<f32>,
    overflow: Arc<AtomicBool>,
}

impl CaptureSide {
    fn capture(&mut self, data: &[f32]) {
        for &sample in data {
            if self.producer.push(sample).is_err() {
                self.overflow.store(true, Ordering::Relaxed);
                break;
            }
        }
    }
}

/// Output-callback half of the duplex bridge.
struct RenderSide {
    consumer: Consumer<f32>,
    scratch: Vec<f32>,
    channels: usize,
    overflow: Arc<AtomicBool>,
    backend_error: Arc<AtomicBool>,
    callback: DuplexCallback,
}

impl RenderSide {
    fn render(&mut self, data: &mut [f32], playback_delay: Option<Duration>) {
        let mut status = StreamStatus::NONE;
        if self.overflow.swap(false, Ordering::Relaxed) {
            status |= StreamStatus::INPUT_OVERFLOW;
        }
        if self.backend_error.swap(false, Ordering::Relaxed) {
            status |= StreamStatus::BACKEND_ERROR;
        }

        let want = data.len().min(self.scratch.len());
        let mut filled = 0;
        while filled < want {
            match self.consumer.pop() {
                Ok(sample) => {
                    self.scratch[filled] = sample;
                    filled += 1;
                }
                Err(_) => break,
            }
        }
        if filled < want {
            self.scratch[filled..want].fill(0.0);
            status |= StreamStatus::INPUT_UNDERFLOW;
        }

        let info = CallbackInfo {
            frames: data.len() / self.channels,
            status,
            playback_delay,
        };
        (self.callback)(&self.scratch[..want], data, info);
    }
}

/// Build the two halves of the capture ring for `config`.
///
/// The render side's scratch buffer holds [`RING_BLOCKS`] blocks so that a
/// backend delivering larger buffers than requested still gets full input.
fn duplex_bridge(
    config: &StreamConfig,
    callback: DuplexCallback,
    backend_error: Arc<AtomicBool>,
) -> (CaptureSide, RenderSide) {
    let block = config.block_samples();
    let (mut producer, consumer) = RingBuffer::<f32>::new(block * RING_BLOCKS);
    for _ in 0..block {
        // Freshly created ring has room for the priming block.
        let _ = producer.push(0.0);
    }

    let overflow = Arc::new(AtomicBool::new(false));
    let capture = CaptureSide {
        producer,
        overflow: Arc::clone(&overflow),
    };
    let render = RenderSide {
        consumer,
        scratch: vec![0.0; block * RING_BLOCKS],
        channels: usize::from(config.channels.max(1)),
        overflow,
        backend_error,
        callback,
    };
    (capture, render)
}

/// Whether any supported range on the device covers the requested shape.
fn supports(
    mut ranges: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
    config: &StreamConfig,
) -> bool {
    ranges.any(|r| {
        r.channels() == config.channels
            && r.min_sample_rate() <= config.sample_rate
            && config.sample_rate <= r.max_sample_rate()
    })
}

/// cpal-based audio backend.
///
/// Holds a cpal [`Host`], the connection to the platform's audio system
/// (ALSA, CoreAudio, WASAPI).
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Create a new cpal backend using the platform's default audio host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal backend initialized");
        Self { host }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        crate::stream::list_devices()
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        let (_, output) = crate::stream::default_device()?;
        Ok(output)
    }

    fn default_input_device(&self) -> Result<Option<AudioDevice>> {
        let (input, _) = crate::stream::default_device()?;
        Ok(input)
    }

    fn build_duplex_stream(
        &self,
        config: &StreamConfig,
        callback: DuplexCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        config.validate()?;
        let input_device = find_input_device(&self.host, config.input_device.as_deref())?;
        let output_device = find_output_device(&self.host, config.output_device.as_deref())?;

        if let Ok(ranges) = input_device.supported_input_configs()
            && !supports(ranges, config)
        {
            return Err(Error::UnsupportedConfig(format!(
                "input device does not support {} ch @ {} Hz",
                config.channels, config.sample_rate
            )));
        }
        if let Ok(ranges) = output_device.supported_output_configs()
            && !supports(ranges, config)
        {
            return Err(Error::UnsupportedConfig(format!(
                "output device does not support {} ch @ {} Hz",
                config.channels, config.sample_rate
            )));
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.block_size),
        };

        let backend_error = Arc::new(AtomicBool::new(false));
        let error_callback = Arc::new(Mutex::new(error_callback));
        let (mut capture, mut render) = duplex_bridge(config, callback, Arc::clone(&backend_error));

        let input_errors = (Arc::clone(&backend_error), Arc::clone(&error_callback));
        let input_stream = input_device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    capture.capture(data);
                },
                move |err| {
                    input_errors.0.store(true, Ordering::Relaxed);
                    let mut report = input_errors.1.lock();
                    (*report)(&format!("input: {err}"));
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        let output_errors = (backend_error, error_callback);
        let output_stream = output_device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                    let ts = info.timestamp();
                    render.render(data, ts.playback.duration_since(&ts.callback));
                },
                move |err| {
                    output_errors.0.store(true, Ordering::Relaxed);
                    let mut report = output_errors.1.lock();
                    (*report)(&format!("output: {err}"));
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        input_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            "duplex stream started"
        );

        Ok(StreamHandle::new((input_stream, output_stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> StreamConfig {
        StreamConfig {
            channels: 2,
            block_size: 4,
            ..StreamConfig::default()
        }
    }

    /// Bridge whose callback copies input to output and records each status.
    fn echo_bridge() -> (CaptureSide, RenderSide, Arc<Mutex<Vec<StreamStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let callback: DuplexCallback = Box::new(move |input: &[f32], output: &mut [f32], info: CallbackInfo| {
            output[..input.len()].copy_from_slice(input);
            log.lock().push(info.status);
        });
        let (capture, render) =
            duplex_bridge(&small_config(), callback, Arc::new(AtomicBool::new(false)));
        (capture, render, seen)
    }

    #[test]
    fn test_cpal_backend_name() {
        let backend = CpalBackend::new();
        assert_eq!(backend.name(), "cpal");
    }

    #[test]
    fn primed_block_is_silence_then_input_follows() {
        let (mut capture, mut render, seen) = echo_bridge();
        let block: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        capture.capture(&block);

        let mut out = [9.0; 8];
        render.render(&mut out, None);
        assert_eq!(out, [0.0; 8]);
        render.render(&mut out, None);
        assert_eq!(out.as_slice(), block.as_slice());
        assert!(seen.lock().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn underflow_pads_and_flags() {
        let (_capture, mut render, seen) = echo_bridge();
        let mut out = [9.0; 8];
        render.render(&mut out, None);
        render.render(&mut out, None);
        assert_eq!(out, [0.0; 8]);
        let seen = seen.lock();
        assert!(seen[0].is_empty());
        assert!(seen[1].contains(StreamStatus::INPUT_UNDERFLOW));
    }

    #[test]
    fn overflow_is_reported_once() {
        let (mut capture, mut render, seen) = echo_bridge();
        // ring holds 4 blocks of 8 samples, one already primed
        capture.capture(&[0.5; 40]);
        let mut out = [0.0; 8];
        render.render(&mut out, None);
        render.render(&mut out, None);
        let seen = seen.lock();
        assert!(seen[0].contains(StreamStatus::INPUT_OVERFLOW));
        assert!(!seen[1].contains(StreamStatus::INPUT_OVERFLOW));
    }

    #[test]
    fn backend_error_flag_reaches_callback() {
        let flag = Arc::new(AtomicBool::new(false));
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&statuses);
        let (_capture, mut render) = duplex_bridge(
            &small_config(),
            Box::new(move |_: &[f32], _: &mut [f32], info: CallbackInfo| log.lock().push(info)),
            Arc::clone(&flag),
        );

        flag.store(true, Ordering::Relaxed);
        let mut out = [0.0; 8];
        render.render(&mut out, Some(Duration::from_millis(3)));

        let infos = statuses.lock();
        assert!(infos[0].status.contains(StreamStatus::BACKEND_ERROR));
        assert_eq!(infos[0].frames, 4);
        assert_eq!(infos[0].playback_delay, Some(Duration::from_millis(3)));
        assert!(!flag.load(Ordering::Relaxed));
    }
}
