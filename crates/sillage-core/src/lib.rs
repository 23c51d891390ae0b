//! Sillage Core - real-time reverb engine
//!
//! This crate holds everything that runs between a control surface and the
//! audio callback, with no device or UI code:
//!
//! - [`impulse`] - synthetic impulse responses from Gaussian noise and a
//!   2-tap decay stage, peak-normalized
//! - [`GaussianNoise`] / [`NoiseSource`] - injectable randomness, seedable
//!   for reproducible responses
//! - [`ReverbParameterStore`] - clamped setters that publish immutable
//!   [`ParameterSnapshot`]s through an atomic swap
//! - [`StreamingConvolutionEngine`] - per-channel feedback filter with the
//!   impulse response as numerator and `[1, -gain]` as denominator, state
//!   carried across blocks
//! - [`partition`] - frequency-domain evaluation of long responses, so the
//!   per-sample cost stays near-flat up to [`MAX_LENGTH_SAMPLES`]
//!
//! # Example
//!
//! ```rust
//! use sillage_core::{GaussianNoise, ReverbParameterStore, StreamingConvolutionEngine};
//!
//! // Control path
//! let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(42));
//! store.set_length(500);
//! store.set_enabled(true);
//!
//! // Audio path, once per block
//! let mut engine = StreamingConvolutionEngine::with_default_capacity(2);
//! let input = vec![0.0_f32; 512];
//! let mut output = vec![0.0_f32; 512];
//! engine.process(&input, &mut output, &store.load());
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: the audio path loads a snapshot wait-free and
//!   processes without allocating or locking
//! - **Copy-on-write parameters**: a snapshot is never mutated after publish
//! - **No surprises in the filter**: no normalization or limiting after
//!   filtering; feedback growth is passed to the output as-is

pub mod engine;
pub mod impulse;
pub mod noise;
pub mod params;
pub mod partition;
pub mod store;

pub use engine::StreamingConvolutionEngine;
pub use impulse::ImpulseResponse;
pub use noise::{GaussianNoise, NoiseSource};
pub use params::{
    DEFAULT_CUTOFF, DEFAULT_DECAY, DEFAULT_GAIN, DEFAULT_LENGTH_SAMPLES, EffectParameters,
    MAX_LENGTH_SAMPLES, Param, ParamDescriptor, SLIDER_POSITIONS, clamp_length,
};
pub use partition::PARTITION_LEN;
pub use store::{ParameterSnapshot, ReverbParameterStore};
