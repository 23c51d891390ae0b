//! Uniformly partitioned frequency-domain convolution for long responses.
//!
//! A response is split into a direct head of [`PARTITION_LEN`] taps, which the
//! engine evaluates sample by sample, and a tail of equal partitions handled
//! in the frequency domain by overlap-save:
//!
//! ```text
//! taps:   | head (P) | part 1 (P) | part 2 (P) | ... | part J (≤ P) |
//! tail(B) = IFFT( Σ_j  H_j · X_{B-j} )[P..2P]      FFT size 2P
//! ```
//!
//! `X_B` is the spectrum of input blocks `B-1` and `B` laid end to end. Tail
//! partition `j` only reads input at least `jP` samples old, so the tail of
//! block `B` depends on completed blocks alone and is computed once, at the
//! block boundary. The head covers the newest `P` inputs with no added
//! latency.
//!
//! Per sample this costs `P` multiply-adds for the head plus roughly
//! `J · (P + 1) / P` complex multiply-adds for the tail, instead of one
//! multiply-add per tap.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Taps per partition, and the length of the direct head.
pub const PARTITION_LEN: usize = 256;

/// Overlap-save transform size.
pub(crate) const FFT_LEN: usize = 2 * PARTITION_LEN;

/// Non-redundant bins of a real signal's spectrum (DC through Nyquist).
pub(crate) const BINS: usize = PARTITION_LEN + 1;

/// Number of frequency-domain partitions past the head for `taps` coefficients.
#[inline]
pub fn tail_partitions(taps: usize) -> usize {
    taps.saturating_sub(PARTITION_LEN).div_ceil(PARTITION_LEN)
}

/// Half-spectra of every tail partition, `BINS` bins each, partition 1 first.
///
/// Empty when the response fits in the head.
pub(crate) fn tail_spectra(taps: &[f32]) -> Arc<[Complex<f32>]> {
    let count = tail_partitions(taps.len());
    if count == 0 {
        return Arc::from(Vec::new());
    }

    let fft = FftPlanner::<f32>::new().plan_fft_forward(FFT_LEN);
    let mut buffer = vec![Complex::default(); FFT_LEN];
    let mut spectra = Vec::with_capacity(count * BINS);
    for part in taps[PARTITION_LEN..].chunks(PARTITION_LEN) {
        buffer.fill(Complex::default());
        for (slot, &h) in buffer.iter_mut().zip(part) {
            *slot = Complex::new(h, 0.0);
        }
        fft.process(&mut buffer);
        spectra.extend_from_slice(&buffer[..BINS]);
    }
    spectra.into()
}

/// FFT plans and scratch shared by every channel of one engine.
///
/// Sized once; the transforms run in place with preallocated scratch.
#[derive(Clone)]
pub(crate) struct Transform {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Transform {
    pub(crate) fn new() -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(FFT_LEN);
        let inverse = planner.plan_fft_inverse(FFT_LEN);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            forward,
            inverse,
            buffer: vec![Complex::default(); FFT_LEN],
            accum: vec![Complex::default(); BINS],
            scratch: vec![Complex::default(); scratch_len],
        }
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("fft_len", &FFT_LEN)
            .finish_non_exhaustive()
    }
}

/// One channel's frequency-domain delay line and pending tail output.
///
/// The delay line holds input spectra, not partial products, so it stays
/// valid when the response changes.
#[derive(Debug, Clone)]
pub(crate) struct TailLine {
    previous: Vec<f32>,
    current: Vec<f32>,
    fill: usize,
    spectra: Vec<Complex<f32>>,
    slots: usize,
    newest: usize,
    output: Vec<f32>,
}

impl TailLine {
    /// Delay line for responses of up to `max_taps` coefficients.
    pub(crate) fn new(max_taps: usize) -> Self {
        let slots = tail_partitions(max_taps);
        Self {
            previous: vec![0.0; PARTITION_LEN],
            current: vec![0.0; PARTITION_LEN],
            fill: 0,
            spectra: vec![Complex::default(); slots * BINS],
            slots,
            newest: 0,
            output: vec![0.0; PARTITION_LEN],
        }
    }

    /// Tail contribution for the current sample, then record `input`.
    ///
    /// At each partition boundary the block's spectrum enters the delay line
    /// and the next block's tail is computed from `kernel`.
    #[inline]
    pub(crate) fn tick(
        &mut self,
        input: f32,
        kernel: &[Complex<f32>],
        transform: &mut Transform,
    ) -> f32 {
        let tail = self.output[self.fill];
        self.current[self.fill] = input;
        self.fill += 1;
        if self.fill == PARTITION_LEN {
            self.fill = 0;
            self.finish_block(kernel, transform);
        }
        tail
    }

    fn finish_block(&mut self, kernel: &[Complex<f32>], transform: &mut Transform) {
        if self.slots == 0 {
            std::mem::swap(&mut self.previous, &mut self.current);
            return;
        }

        let Transform {
            forward,
            inverse,
            buffer,
            accum,
            scratch,
        } = transform;

        for (slot, &x) in buffer
            .iter_mut()
            .zip(self.previous.iter().chain(self.current.iter()))
        {
            *slot = Complex::new(x, 0.0);
        }
        forward.process_with_scratch(buffer, scratch);

        self.newest = (self.newest + 1) % self.slots;
        let start = self.newest * BINS;
        self.spectra[start..start + BINS].copy_from_slice(&buffer[..BINS]);
        std::mem::swap(&mut self.previous, &mut self.current);

        let partitions = (kernel.len() / BINS).min(self.slots);
        if partitions == 0 {
            self.output.fill(0.0);
            return;
        }

        // Partition j pairs with the spectrum j - 1 slots before the newest.
        accum.fill(Complex::default());
        for (j, part) in kernel.chunks_exact(BINS).take(partitions).enumerate() {
            let slot = (self.newest + self.slots - j) % self.slots;
            let input = &self.spectra[slot * BINS..(slot + 1) * BINS];
            for ((acc, &h), &x) in accum.iter_mut().zip(part).zip(input) {
                *acc += h * x;
            }
        }

        buffer[..BINS].copy_from_slice(accum);
        for k in 1..PARTITION_LEN {
            buffer[FFT_LEN - k] = accum[k].conj();
        }
        inverse.process_with_scratch(buffer, scratch);

        let scale = 1.0 / FFT_LEN as f32;
        for (out, bin) in self.output.iter_mut().zip(&buffer[PARTITION_LEN..]) {
            *out = bin.re * scale;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.previous.fill(0.0);
        self.current.fill(0.0);
        self.fill = 0;
        self.spectra.fill(Complex::default());
        self.newest = 0;
        self.output.fill(0.0);
    }
}
