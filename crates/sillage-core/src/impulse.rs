//! Synthetic impulse response generation.
//!
//! A reverb tail is approximated by Gaussian noise passed through a 2-tap
//! decay stage and peak-normalized:
//!
//! ```text
//! n[i]  ~ N(0, 1)                      i = 0 .. length-1
//! h[i]  = n[i] + decay * n[i-1]         full convolution with [1, decay]
//! h     = h / max|h|                    length + 1 taps, peak 1.0
//! ```
//!
//! Generation is pure given the [`NoiseSource`]: the same draws always give
//! the same response.

use std::sync::Arc;

use rustfft::num_complex::Complex;

use crate::noise::NoiseSource;
use crate::partition;

/// Immutable, cheaply clonable filter kernel.
///
/// Clones share one allocation. A published response is never mutated;
/// parameter changes replace it wholesale.
///
/// Taps past the first [`PARTITION_LEN`](crate::PARTITION_LEN) are also kept
/// as partition spectra, transformed here on the control path so the engine
/// never runs a forward transform of the kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    taps: Arc<[f32]>,
    tail: Arc<[Complex<f32>]>,
}

impl ImpulseResponse {
    /// Wrap precomputed taps.
    pub fn from_taps(taps: Vec<f32>) -> Self {
        let tail = partition::tail_spectra(&taps);
        Self {
            taps: taps.into(),
            tail,
        }
    }

    /// Filter coefficients, newest-input first.
    #[inline]
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// Tail partition spectra, empty when every tap fits the direct head.
    #[inline]
    pub(crate) fn tail_spectra(&self) -> &[Complex<f32>] {
        &self.tail
    }

    /// Number of taps.
    #[inline]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Whether there are no taps.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Largest absolute tap value.
    pub fn peak(&self) -> f32 {
        self.taps.iter().fold(0.0_f32, |m, &t| m.max(t.abs()))
    }

    /// Sum of squared taps.
    pub fn energy(&self) -> f32 {
        self.taps.iter().map(|&t| t * t).sum()
    }

    /// Whether two handles share the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.taps, &b.taps)
    }
}

/// Generate a normalized impulse response.
///
/// Returns `None` when `length == 0`: no response exists and the engine
/// must pass audio through. Otherwise the result has `length + 1` taps with
/// a peak magnitude of exactly `1.0`, or all zeros if every draw was zero.
///
/// # Example
///
/// ```rust
/// use sillage_core::{GaussianNoise, impulse};
///
/// let mut noise = GaussianNoise::seeded(3);
/// let ir = impulse::generate(256, 0.8, &mut noise).unwrap();
/// assert_eq!(ir.len(), 257);
/// assert_eq!(ir.peak(), 1.0);
///
/// assert!(impulse::generate(0, 0.8, &mut noise).is_none());
/// ```
pub fn generate(length: usize, decay: f32, noise: &mut dyn NoiseSource) -> Option<ImpulseResponse> {
    if length == 0 {
        return None;
    }

    let draws: Vec<f32> = (0..length).map(|_| noise.standard_normal()).collect();
    let mut taps = decay_stage(&draws, decay);
    normalize_peak(&mut taps);

    #[cfg(feature = "tracing")]
    tracing::debug!(length, decay, taps = taps.len(), "impulse response generated");

    Some(ImpulseResponse::from_taps(taps))
}

/// Full convolution of `signal` with the kernel `[1, decay]`.
///
/// Output length is `signal.len() + 1`; empty input gives empty output.
pub fn decay_stage(signal: &[f32], decay: f32) -> Vec<f32> {
    let Some(&last) = signal.last() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(signal.len() + 1);
    let mut prev = 0.0;
    for &x in signal {
        out.push(x + decay * prev);
        prev = x;
    }
    out.push(decay * last);
    out
}

/// Scale `taps` in place so the largest magnitude is `1.0`.
///
/// A silent (all-zero) or non-finite peak leaves a zero vector instead of
/// dividing through.
pub fn normalize_peak(taps: &mut [f32]) {
    let peak = taps.iter().fold(0.0_f32, |m, &t| m.max(t.abs()));
    if peak == 0.0 || !peak.is_finite() {
        taps.fill(0.0);
        return;
    }
    for t in taps.iter_mut() {
        *t /= peak;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GaussianNoise;

    struct Scripted(Vec<f32>, usize);

    impl NoiseSource for Scripted {
        fn standard_normal(&mut self) -> f32 {
            let v = self.0[self.1 % self.0.len()];
            self.1 += 1;
            v
        }
    }

    #[test]
    fn zero_length_is_absent() {
        let mut noise = GaussianNoise::seeded(0);
        assert!(generate(0, 0.5, &mut noise).is_none());
    }

    #[test]
    fn length_is_full_convolution() {
        let mut noise = GaussianNoise::seeded(0);
        for len in [1, 2, 17, 3000] {
            assert_eq!(generate(len, 0.8, &mut noise).unwrap().len(), len + 1);
        }
    }

    #[test]
    fn decay_stage_matches_hand_convolution() {
        let out = decay_stage(&[1.0, 2.0, -1.0], 0.5);
        assert_eq!(out, vec![1.0, 2.5, 0.0, -0.5]);
        assert!(decay_stage(&[], 0.5).is_empty());
    }

    #[test]
    fn scripted_draws_are_normalized() {
        let mut noise = Scripted(vec![2.0, -4.0], 0);
        let ir = generate(2, 0.5, &mut noise).unwrap();
        // [2, -4 + 1, -2] / 3
        let expected = [2.0 / 3.0, -1.0, -2.0 / 3.0];
        for (a, b) in ir.taps().iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
        assert_eq!(ir.peak(), 1.0);
    }

    #[test]
    fn all_zero_draws_give_zero_response() {
        let mut noise = Scripted(vec![0.0], 0);
        let ir = generate(64, 0.8, &mut noise).unwrap();
        assert_eq!(ir.len(), 65);
        assert!(ir.taps().iter().all(|&t| t == 0.0));
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = generate(500, 0.3, &mut GaussianNoise::seeded(9)).unwrap();
        let b = generate(500, 0.3, &mut GaussianNoise::seeded(9)).unwrap();
        assert_eq!(a, b);
        assert!(!ImpulseResponse::ptr_eq(&a, &b));
    }

    #[test]
    fn clones_share_storage() {
        let a = generate(10, 0.3, &mut GaussianNoise::seeded(1)).unwrap();
        let b = a.clone();
        assert!(ImpulseResponse::ptr_eq(&a, &b));
    }

    #[test]
    fn long_responses_carry_tail_spectra() {
        let short = ImpulseResponse::from_taps(vec![1.0; crate::PARTITION_LEN]);
        assert!(short.tail_spectra().is_empty());

        let long = generate(3000, 0.8, &mut GaussianNoise::seeded(2)).unwrap();
        let parts = partition::tail_partitions(long.len());
        assert_eq!(long.tail_spectra().len(), parts * partition::BINS);
    }

    #[test]
    fn energy_of_unit_taps() {
        let ir = ImpulseResponse::from_taps(vec![1.0, -1.0, 0.0]);
        assert_eq!(ir.energy(), 2.0);
        assert_eq!(ir.peak(), 1.0);
    }
}
