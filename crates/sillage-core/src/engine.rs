//! Streaming feedback filter that applies the impulse response.
//!
//! Each channel runs the rational filter with the impulse response `h` as
//! numerator and `[1, -gain]` as denominator:
//!
//! ```text
//! y[n] = Σ_k h[k] · x[n-k]  +  gain · y[n-1]
//! ```
//!
//! The numerator is split at [`PARTITION_LEN`]. The first taps run as a
//! direct-form FIR over a short delay line, so the newest input reaches the
//! output on the same sample. The remaining taps run through the
//! [`partition`](crate::partition) delay line in the frequency domain. The
//! feedback term stays sample by sample.
//!
//! State is the per-channel history of past inputs (raw samples for the head,
//! input spectra for the tail) plus the previous output. Neither depends on
//! the coefficients, so a new snapshot can swap the taps or their count and
//! the new kernel reads the same history. The head and the gain follow a swap
//! on the next sample; tail partitions follow it at the next partition
//! boundary, at most `PARTITION_LEN - 1` samples later.
//!
//! Splitting a stream into blocks of any size yields the same output as
//! filtering it in one pass: partition boundaries are counted from the start
//! of the stream, not from the start of a call.
//!
//! # Real-Time Safety
//!
//! All delay-line memory, FFT plans and scratch are allocated in
//! [`StreamingConvolutionEngine::new`].
//! [`process`](StreamingConvolutionEngine::process) neither allocates nor
//! locks. The output is not normalized or limited: with `gain` near `1.0`
//! and a high-energy response the signal can grow without bound.

use rustfft::num_complex::Complex;

use crate::partition::{PARTITION_LEN, TailLine, Transform};
use crate::store::ParameterSnapshot;

/// One channel's filter state.
///
/// Head inputs are written twice, at `pos` and `pos + capacity`, so the
/// newest `k` samples always form one contiguous slice ending at
/// `pos + capacity`.
#[derive(Debug, Clone)]
struct ChannelState {
    history: Vec<f32>,
    pos: usize,
    tail: TailLine,
    last_output: f32,
}

impl ChannelState {
    fn new(max_taps: usize) -> Self {
        let head_capacity = max_taps.min(PARTITION_LEN);
        Self {
            history: vec![0.0; head_capacity * 2],
            pos: 0,
            tail: TailLine::new(max_taps),
            last_output: 0.0,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.history.len() / 2
    }

    #[inline]
    fn tick(
        &mut self,
        input: f32,
        head: &[f32],
        kernel: &[Complex<f32>],
        gain: f32,
        transform: &mut Transform,
    ) -> f32 {
        let capacity = self.capacity();
        self.history[self.pos] = input;
        self.history[self.pos + capacity] = input;

        let newest = self.pos + capacity;
        let window = &self.history[newest + 1 - head.len()..=newest];
        let fir: f32 = head
            .iter()
            .zip(window.iter().rev())
            .map(|(&h, &x)| h * x)
            .sum();
        let tail = self.tail.tick(input, kernel, transform);

        let y = fir + tail + gain * self.last_output;
        self.last_output = y;
        self.pos = (self.pos + 1) % capacity;
        y
    }

    fn clear(&mut self) {
        self.history.fill(0.0);
        self.pos = 0;
        self.tail.clear();
        self.last_output = 0.0;
    }
}

/// Stateful multi-channel filter driven by [`ParameterSnapshot`]s.
///
/// Buffers are interleaved (`[L0, R0, L1, R1, ...]`).
///
/// # Example
///
/// ```rust
/// use sillage_core::{GaussianNoise, ReverbParameterStore, StreamingConvolutionEngine};
///
/// let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(5));
/// store.set_length(64);
/// store.set_enabled(true);
///
/// let mut engine = StreamingConvolutionEngine::new(2, 65);
/// let input = [1.0, 1.0, 0.0, 0.0];
/// let mut output = [0.0; 4];
/// engine.process(&input, &mut output, &store.load());
///
/// let snap = store.current_snapshot();
/// assert_eq!(output[0], snap.impulse.as_ref().unwrap().taps()[0]);
/// ```
#[derive(Debug, Clone)]
pub struct StreamingConvolutionEngine {
    channels: Vec<ChannelState>,
    max_taps: usize,
    transform: Transform,
}

impl StreamingConvolutionEngine {
    /// Create an engine for `channels` interleaved channels that can apply
    /// responses of up to `max_taps` coefficients.
    ///
    /// A snapshot whose response is longer than `max_taps` is passed through
    /// rather than truncated.
    pub fn new(channels: usize, max_taps: usize) -> Self {
        let channels = channels.max(1);
        let max_taps = max_taps.max(1);
        Self {
            channels: (0..channels).map(|_| ChannelState::new(max_taps)).collect(),
            max_taps,
            transform: Transform::new(),
        }
    }

    /// Engine sized for the longest response the store can publish.
    pub fn with_default_capacity(channels: usize) -> Self {
        Self::new(channels, crate::MAX_LENGTH_SAMPLES + 1)
    }

    /// Number of interleaved channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Longest impulse response this engine can apply.
    pub fn max_taps(&self) -> usize {
        self.max_taps
    }

    /// Filter one interleaved block.
    ///
    /// Passes `input` through unchanged, leaving all state untouched, when the
    /// snapshot is disabled, has no response, or the response exceeds
    /// [`max_taps`](Self::max_taps). Only `min(input.len(), output.len())`
    /// samples are written; a trailing partial frame is copied through.
    pub fn process(&mut self, input: &[f32], output: &mut [f32], snapshot: &ParameterSnapshot) {
        let len = input.len().min(output.len());
        let (input, output) = (&input[..len], &mut output[..len]);

        let ir = match &snapshot.impulse {
            Some(ir) if snapshot.params.enabled && !ir.is_empty() && ir.len() <= self.max_taps => {
                ir
            }
            _ => {
                output.copy_from_slice(input);
                return;
            }
        };
        let taps = ir.taps();
        let head = &taps[..taps.len().min(PARTITION_LEN)];
        let kernel = ir.tail_spectra();
        let gain = snapshot.params.gain;

        let stride = self.channels.len();
        let whole = len - len % stride;
        for (frame_in, frame_out) in input[..whole]
            .chunks_exact(stride)
            .zip(output[..whole].chunks_exact_mut(stride))
        {
            for ((state, &x), y) in self.channels.iter_mut().zip(frame_in).zip(frame_out) {
                *y = state.tick(x, head, kernel, gain, &mut self.transform);
            }
        }
        output[whole..].copy_from_slice(&input[whole..]);
    }

    /// Clear every delay line and feedback sample.
    ///
    /// Not called on snapshot swaps or enable toggles; the filter resumes
    /// from its carried state in both cases.
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            state.clear();
        }
    }
}
