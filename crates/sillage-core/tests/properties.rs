//! Property-based tests for sillage-core.
//!
//! Tests impulse normalization, block-split continuity, and parameter
//! clamping using proptest for randomized input generation.

use proptest::prelude::*;
use sillage_core::{
    GaussianNoise, MAX_LENGTH_SAMPLES, Param, ReverbParameterStore, StreamingConvolutionEngine,
    impulse,
};

fn filter_in_blocks(
    store: &ReverbParameterStore,
    channels: usize,
    input: &[f32],
    split_frames: &[usize],
) -> Vec<f32> {
    let mut engine = StreamingConvolutionEngine::new(channels, 512);
    let mut output = vec![0.0; input.len()];
    let mut start = 0;
    for &frames in split_frames {
        let end = (start + frames * channels).min(input.len());
        engine.process(&input[start..end], &mut output[start..end], &store.load());
        start = end;
    }
    engine.process(&input[start..], &mut output[start..], &store.load());
    output
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any non-zero length yields `length + 1` taps peaking at exactly 1.0.
    #[test]
    fn generated_response_is_peak_normalized(
        length in 1usize..4000,
        decay in 0.0f32..=1.0f32,
        seed in any::<u64>(),
    ) {
        let ir = impulse::generate(length, decay, &mut GaussianNoise::seeded(seed)).unwrap();
        prop_assert_eq!(ir.len(), length + 1);
        prop_assert_eq!(ir.peak(), 1.0);
        prop_assert!(ir.taps().iter().all(|t| t.is_finite()));
    }

    /// Filtering in arbitrary block sizes matches a single pass exactly.
    #[test]
    fn block_split_continuity(
        length in 1usize..300,
        gain in 0.0f32..0.99f32,
        seed in any::<u64>(),
        channels in 1usize..=2,
        input in prop::collection::vec(-1.0f32..=1.0f32, 64..1024),
        splits in prop::collection::vec(0usize..200, 0..8),
    ) {
        let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(seed));
        store.set_length(length);
        store.set_gain(gain);
        store.set_enabled(true);

        let whole = filter_in_blocks(&store, channels, &input, &[]);
        let split = filter_in_blocks(&store, channels, &input, &splits);
        prop_assert_eq!(whole, split);
    }

    /// With gain below one and bounded input the output stays finite.
    #[test]
    fn stable_gain_keeps_output_finite(
        length in 1usize..200,
        gain in 0.0f32..0.95f32,
        seed in any::<u64>(),
        input in prop::collection::vec(-1.0f32..=1.0f32, 256..2048),
    ) {
        let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(seed));
        store.set_length(length);
        store.set_gain(gain);
        store.set_enabled(true);

        let mut engine = StreamingConvolutionEngine::new(1, 256);
        let mut output = vec![0.0; input.len()];
        engine.process(&input, &mut output, &store.load());
        prop_assert!(output.iter().all(|s| s.is_finite()));
    }

    /// Setters never publish a value outside the parameter's range.
    #[test]
    fn setters_clamp_into_range(
        gain in prop::num::f32::ANY,
        cutoff in prop::num::f32::ANY,
        decay in prop::num::f32::ANY,
        length in any::<usize>(),
    ) {
        let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(0));
        store.set_gain(gain);
        store.set_cutoff(cutoff);
        store.set_decay(decay);
        store.set_length(length % (MAX_LENGTH_SAMPLES * 2));

        let p = store.params();
        for param in [Param::Gain, Param::Cutoff, Param::Decay, Param::Length] {
            let d = param.descriptor();
            let v = p.get(param);
            prop_assert!(v >= d.min && v <= d.max, "{:?} = {} out of range", param, v);
        }
    }

    /// Disabled snapshots pass any input through bit-exactly.
    #[test]
    fn disabled_is_identity(
        input in prop::collection::vec(prop::num::f32::NORMAL, 0..512),
    ) {
        let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(1));
        store.set_length(100);
        let mut engine = StreamingConvolutionEngine::with_default_capacity(2);
        let mut output = vec![0.0; input.len()];
        engine.process(&input, &mut output, &store.load());
        prop_assert_eq!(output, input);
    }
}
