//! Effect parameters and their descriptors.
//!
//! [`EffectParameters`] is the plain value bundle carried by every
//! [`ParameterSnapshot`](crate::ParameterSnapshot). Each continuous parameter
//! is described by a [`ParamDescriptor`] holding its range, default, and the
//! slider mapping used by control surfaces.
//!
//! Out-of-range input is never an error: every setter path goes through
//! [`ParamDescriptor::clamp`], matching a slider-bounded control model.
//!
//! # Example
//!
//! ```rust
//! use sillage_core::{EffectParameters, Param};
//!
//! let params = EffectParameters::default();
//! assert_eq!(params.gain, 0.8);
//! assert_eq!(Param::Gain.descriptor().clamp(1.5), 1.0);
//! ```

/// Largest impulse length accepted by the store, in noise samples.
///
/// The engine preallocates its delay lines for this many taps (plus one for
/// the decay stage), so the audio thread never resizes state.
pub const MAX_LENGTH_SAMPLES: usize = 48_000;

/// Number of positions on a control slider (`0..=SLIDER_POSITIONS`).
pub const SLIDER_POSITIONS: u32 = 100;

/// Default feedback gain.
pub const DEFAULT_GAIN: f32 = 0.8;
/// Default impulse length in samples.
pub const DEFAULT_LENGTH_SAMPLES: usize = 3000;
/// Default cutoff (normalized).
pub const DEFAULT_CUTOFF: f32 = 0.5;
/// Default decay factor of the 2-tap decay stage.
pub const DEFAULT_DECAY: f32 = 0.8;

/// Range, display name and slider mapping for one continuous parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Full parameter name (e.g., "Decay Factor").
    pub name: &'static str,
    /// Stable identifier used by text control surfaces (e.g., `"decay"`).
    pub string_id: &'static str,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Value at startup.
    pub default: f32,
    /// Value covered by the full travel of the control slider.
    ///
    /// A slider at position `p` out of [`SLIDER_POSITIONS`] maps to
    /// `min + p * slider_span / SLIDER_POSITIONS`. The normalized parameters
    /// span `1.0`; the length slider spans 1000 samples in steps of ten.
    pub slider_span: f32,
}

impl ParamDescriptor {
    /// Clamp a raw value into `[min, max]`.
    ///
    /// NaN maps to `min` so a bad control message can never poison a snapshot.
    ///
    /// ```rust
    /// use sillage_core::Param;
    ///
    /// let gain = Param::Gain.descriptor();
    /// assert_eq!(gain.clamp(-0.3), 0.0);
    /// assert_eq!(gain.clamp(f32::NAN), 0.0);
    /// ```
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() || value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Plain value for an integer slider position, clamped to range.
    ///
    /// ```rust
    /// use sillage_core::Param;
    ///
    /// assert_eq!(Param::Decay.descriptor().from_slider(80), 0.8);
    /// assert_eq!(Param::Length.descriptor().from_slider(100), 1000.0);
    /// ```
    pub fn from_slider(&self, position: u32) -> f32 {
        self.clamp(self.min + position as f32 * self.slider_span / SLIDER_POSITIONS as f32)
    }
}

/// The four continuous reverb parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// Feedback gain of the single-pole denominator `[1, -gain]`.
    Gain,
    /// Impulse length in samples before the decay stage.
    Length,
    /// Cutoff, normalized. Stored and displayed; the filter does not read it.
    Cutoff,
    /// Second tap of the `[1, decay]` decay stage.
    Decay,
}

const GAIN: ParamDescriptor = ParamDescriptor {
    name: "Reverb Gain",
    string_id: "gain",
    min: 0.0,
    max: 1.0,
    default: DEFAULT_GAIN,
    slider_span: 1.0,
};

const LENGTH: ParamDescriptor = ParamDescriptor {
    name: "Reverb Length",
    string_id: "length",
    min: 0.0,
    max: MAX_LENGTH_SAMPLES as f32,
    default: DEFAULT_LENGTH_SAMPLES as f32,
    slider_span: 1000.0,
};

const CUTOFF: ParamDescriptor = ParamDescriptor {
    name: "Cutoff Frequency",
    string_id: "cutoff",
    min: 0.0,
    max: 1.0,
    default: DEFAULT_CUTOFF,
    slider_span: 1.0,
};

const DECAY: ParamDescriptor = ParamDescriptor {
    name: "Decay Factor",
    string_id: "decay",
    min: 0.0,
    max: 1.0,
    default: DEFAULT_DECAY,
    slider_span: 1.0,
};

impl Param {
    /// All parameters in display order.
    pub const ALL: [Param; 4] = [Param::Gain, Param::Length, Param::Cutoff, Param::Decay];

    /// Descriptor for this parameter.
    pub const fn descriptor(self) -> &'static ParamDescriptor {
        match self {
            Param::Gain => &GAIN,
            Param::Length => &LENGTH,
            Param::Cutoff => &CUTOFF,
            Param::Decay => &DECAY,
        }
    }

    /// Look up a parameter by its `string_id`, case-insensitively.
    pub fn from_id(id: &str) -> Option<Param> {
        Param::ALL
            .into_iter()
            .find(|p| p.descriptor().string_id.eq_ignore_ascii_case(id))
    }
}

/// Current values of every reverb parameter.
///
/// Invariant: `length_samples == 0` means no impulse response exists, so the
/// engine passes audio through regardless of `enabled`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameters {
    /// Feedback gain, `[0, 1]`.
    pub gain: f32,
    /// Impulse length in samples, `[0, MAX_LENGTH_SAMPLES]`.
    pub length_samples: usize,
    /// Cutoff, `[0, 1]`.
    pub cutoff: f32,
    /// Decay factor, `[0, 1]`.
    pub decay: f32,
    /// Whether the reverb is applied.
    pub enabled: bool,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            length_samples: DEFAULT_LENGTH_SAMPLES,
            cutoff: DEFAULT_CUTOFF,
            decay: DEFAULT_DECAY,
            enabled: false,
        }
    }
}

impl EffectParameters {
    /// Return a copy with every field clamped into range.
    pub fn clamped(self) -> Self {
        Self {
            gain: GAIN.clamp(self.gain),
            length_samples: clamp_length(self.length_samples),
            cutoff: CUTOFF.clamp(self.cutoff),
            decay: DECAY.clamp(self.decay),
            enabled: self.enabled,
        }
    }

    /// Read a continuous parameter as `f32`.
    pub fn get(&self, param: Param) -> f32 {
        match param {
            Param::Gain => self.gain,
            Param::Length => self.length_samples as f32,
            Param::Cutoff => self.cutoff,
            Param::Decay => self.decay,
        }
    }
}

/// Clamp an impulse length to `[0, MAX_LENGTH_SAMPLES]`.
#[inline]
pub fn clamp_length(samples: usize) -> usize {
    samples.min(MAX_LENGTH_SAMPLES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_state() {
        let p = EffectParameters::default();
        assert_eq!(p.gain, 0.8);
        assert_eq!(p.length_samples, 3000);
        assert_eq!(p.cutoff, 0.5);
        assert_eq!(p.decay, 0.8);
        assert!(!p.enabled);
    }

    #[test]
    fn descriptor_defaults_agree_with_parameters() {
        let p = EffectParameters::default();
        for param in Param::ALL {
            assert_eq!(param.descriptor().default, p.get(param), "{param:?}");
        }
    }

    #[test]
    fn clamp_bounds_and_nan() {
        let d = Param::Cutoff.descriptor();
        assert_eq!(d.clamp(2.0), 1.0);
        assert_eq!(d.clamp(-1.0), 0.0);
        assert_eq!(d.clamp(0.25), 0.25);
        assert_eq!(d.clamp(f32::NAN), 0.0);
        assert_eq!(d.clamp(f32::INFINITY), 1.0);
    }

    #[test]
    fn clamped_parameters() {
        let p = EffectParameters {
            gain: 3.0,
            length_samples: MAX_LENGTH_SAMPLES * 2,
            cutoff: -0.5,
            decay: f32::NAN,
            enabled: true,
        }
        .clamped();
        assert_eq!(p.gain, 1.0);
        assert_eq!(p.length_samples, MAX_LENGTH_SAMPLES);
        assert_eq!(p.cutoff, 0.0);
        assert_eq!(p.decay, 0.0);
        assert!(p.enabled);
    }

    #[test]
    fn slider_mapping() {
        assert_eq!(Param::Gain.descriptor().from_slider(0), 0.0);
        assert_eq!(Param::Gain.descriptor().from_slider(55), 0.55);
        assert_eq!(Param::Gain.descriptor().from_slider(250), 1.0);
        assert_eq!(Param::Length.descriptor().from_slider(30), 300.0);
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(Param::from_id("decay"), Some(Param::Decay));
        assert_eq!(Param::from_id("GAIN"), Some(Param::Gain));
        assert_eq!(Param::from_id("mix"), None);
    }
}
