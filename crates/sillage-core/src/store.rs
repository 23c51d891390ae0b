//! Parameter store with atomic snapshot publishing.
//!
//! The control path mutates one field at a time; every mutation builds a
//! fresh immutable [`ParameterSnapshot`] and swaps it into an [`ArcSwap`].
//! The audio path only ever calls [`ReverbParameterStore::load`], which never
//! blocks on a writer, and therefore sees either the old snapshot or the new
//! one, never a mix.
//!
//! # Thread Safety
//!
//! - **Current snapshot**: `ArcSwap::load()`, wait-free for readers.
//! - **Writers**: serialized by a `parking_lot::Mutex` that only the control
//!   path takes. It also owns the noise source used for regeneration.
//! - **Reclamation**: replaced snapshots move to a retired list held under
//!   the same lock. A retired snapshot is dropped by the control path once no
//!   audio callback still references it, so the audio thread never runs a
//!   deallocation.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;

use crate::impulse::{self, ImpulseResponse};
use crate::noise::{GaussianNoise, NoiseSource};
use crate::params::{EffectParameters, Param, clamp_length};

/// An immutable parameter set plus the impulse response derived from it.
#[derive(Debug, Clone)]
pub struct ParameterSnapshot {
    /// Parameter values at publish time.
    pub params: EffectParameters,
    /// Active impulse response; `None` when `params.length_samples == 0`.
    pub impulse: Option<ImpulseResponse>,
    /// Incremented on every publish.
    pub revision: u64,
    /// Incremented only when the impulse response is regenerated.
    pub impulse_revision: u64,
}

impl ParameterSnapshot {
    /// Whether the engine should filter with this snapshot.
    ///
    /// False when disabled or when no impulse response exists.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.params.enabled && self.impulse.is_some()
    }
}

/// Control-side state guarded by the writer lock.
struct Writer {
    noise: Box<dyn NoiseSource>,
    retired: Vec<Arc<ParameterSnapshot>>,
}

/// Holds the current effect parameters and publishes snapshots.
///
/// Share it between the control path and the audio callback with an `Arc`.
///
/// # Example
///
/// ```rust
/// use sillage_core::{GaussianNoise, ReverbParameterStore};
///
/// let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(1));
/// store.set_gain(1.5);
/// assert_eq!(store.current_snapshot().params.gain, 1.0);
/// ```
pub struct ReverbParameterStore {
    current: ArcSwap<ParameterSnapshot>,
    writer: Mutex<Writer>,
}

impl ReverbParameterStore {
    /// Store with default parameters and entropy-seeded noise.
    pub fn new() -> Self {
        Self::with_noise(GaussianNoise::from_entropy())
    }

    /// Store with default parameters drawing from `noise`.
    pub fn with_noise(noise: impl NoiseSource + 'static) -> Self {
        Self::with_params(EffectParameters::default(), noise)
    }

    /// Store starting from `params` (clamped) drawing from `noise`.
    ///
    /// The initial impulse response is generated immediately, so enabling the
    /// effect applies it without waiting for a length or decay change.
    pub fn with_params(params: EffectParameters, noise: impl NoiseSource + 'static) -> Self {
        let mut noise: Box<dyn NoiseSource> = Box::new(noise);
        let params = params.clamped();
        let impulse = impulse::generate(params.length_samples, params.decay, noise.as_mut());

        Self {
            current: ArcSwap::from_pointee(ParameterSnapshot {
                params,
                impulse,
                revision: 0,
                impulse_revision: 0,
            }),
            writer: Mutex::new(Writer {
                noise,
                retired: Vec::new(),
            }),
        }
    }

    /// Load the current snapshot for the audio path.
    ///
    /// Never waits on a writer. Hold the guard for at most one block.
    #[inline]
    pub fn load(&self) -> Guard<Arc<ParameterSnapshot>> {
        self.current.load()
    }

    /// Owned handle to the current snapshot for the control path.
    pub fn current_snapshot(&self) -> Arc<ParameterSnapshot> {
        self.current.load_full()
    }

    /// Current parameter values.
    pub fn params(&self) -> EffectParameters {
        self.current.load().params
    }

    /// Set the feedback gain, clamped to `[0, 1]`. Reuses the impulse response.
    pub fn set_gain(&self, gain: f32) {
        let gain = Param::Gain.descriptor().clamp(gain);
        self.update(false, |p| p.gain = gain);
    }

    /// Set the impulse length in samples, clamped to `MAX_LENGTH_SAMPLES`.
    /// Always regenerates.
    pub fn set_length(&self, samples: usize) {
        let samples = clamp_length(samples);
        self.update(true, |p| p.length_samples = samples);
    }

    /// Set the cutoff, clamped to `[0, 1]`. Reuses the impulse response.
    pub fn set_cutoff(&self, cutoff: f32) {
        let cutoff = Param::Cutoff.descriptor().clamp(cutoff);
        self.update(false, |p| p.cutoff = cutoff);
    }

    /// Set the decay factor, clamped to `[0, 1]`. Always regenerates.
    pub fn set_decay(&self, decay: f32) {
        let decay = Param::Decay.descriptor().clamp(decay);
        self.update(true, |p| p.decay = decay);
    }

    /// Enable or disable the effect. Reuses the impulse response.
    pub fn set_enabled(&self, enabled: bool) {
        self.update(false, |p| p.enabled = enabled);
    }

    /// Flip the enabled flag and return the new state.
    pub fn toggle_enabled(&self) -> bool {
        let mut enabled = false;
        self.update(false, |p| {
            p.enabled = !p.enabled;
            enabled = p.enabled;
        });
        enabled
    }

    /// Set a continuous parameter by kind.
    ///
    /// Length values are rounded to the nearest sample; negative values
    /// clamp to zero.
    pub fn set(&self, param: Param, value: f32) {
        match param {
            Param::Gain => self.set_gain(value),
            Param::Length => {
                let samples = Param::Length.descriptor().clamp(value.round());
                self.set_length(samples as usize);
            }
            Param::Cutoff => self.set_cutoff(value),
            Param::Decay => self.set_decay(value),
        }
    }

    /// Drop retired snapshots that no audio callback still references.
    ///
    /// Runs automatically on every publish; call it from an idle control
    /// loop to release memory between parameter changes.
    pub fn collect_garbage(&self) -> usize {
        let mut writer = self.writer.lock();
        Self::sweep(&mut writer.retired)
    }

    /// Number of replaced snapshots still awaiting reclamation.
    pub fn retired_count(&self) -> usize {
        self.writer.lock().retired.len()
    }

    fn sweep(retired: &mut Vec<Arc<ParameterSnapshot>>) -> usize {
        let before = retired.len();
        retired.retain(|snap| Arc::strong_count(snap) > 1);
        before - retired.len()
    }

    /// Build and publish a new snapshot from the current one.
    fn update(&self, regenerate: bool, mutate: impl FnOnce(&mut EffectParameters)) {
        let mut writer = self.writer.lock();
        let previous = self.current.load_full();

        let mut params = previous.params;
        mutate(&mut params);

        let (impulse, impulse_revision) = if regenerate {
            (
                impulse::generate(params.length_samples, params.decay, writer.noise.as_mut()),
                previous.impulse_revision + 1,
            )
        } else {
            (previous.impulse.clone(), previous.impulse_revision)
        };

        let revision = previous.revision + 1;
        let next = Arc::new(ParameterSnapshot {
            params,
            impulse,
            revision,
            impulse_revision,
        });

        let replaced = self.current.swap(next);
        drop(previous);
        writer.retired.push(replaced);
        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        let freed = Self::sweep(&mut writer.retired);

        #[cfg(feature = "tracing")]
        tracing::debug!(revision, regenerate, freed, "parameter snapshot published");
    }
}

impl Default for ReverbParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReverbParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverbParameterStore")
            .field("current", &self.current.load().params)
            .finish_non_exhaustive()
    }
}
