//! Offline impulse response inspection.

use clap::Args;
use sillage_core::{
    DEFAULT_DECAY, DEFAULT_GAIN, DEFAULT_LENGTH_SAMPLES, GaussianNoise, ImpulseResponse, Param,
    clamp_length, impulse,
};

#[derive(Args)]
pub struct InspectArgs {
    /// Impulse length in samples
    #[arg(short, long, default_value_t = DEFAULT_LENGTH_SAMPLES)]
    length: usize,

    /// Decay factor (0..1)
    #[arg(short, long, default_value_t = DEFAULT_DECAY)]
    decay: f32,

    /// Feedback gain used for the DC gain estimate (0..1)
    #[arg(short, long, default_value_t = DEFAULT_GAIN)]
    gain: f32,

    /// Noise seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of leading taps to print
    #[arg(long, default_value_t = 8)]
    head: usize,

    /// Print every tap, one per line, instead of the summary
    #[arg(long)]
    dump: bool,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let length = clamp_length(args.length);
    let decay = Param::Decay.descriptor().clamp(args.decay);
    let gain = Param::Gain.descriptor().clamp(args.gain);
    let mut noise = match args.seed {
        Some(seed) => GaussianNoise::seeded(seed),
        None => GaussianNoise::from_entropy(),
    };

    let Some(ir) = impulse::generate(length, decay, &mut noise) else {
        println!("Impulse length 0: no response, reverb passes audio through.");
        return Ok(());
    };

    if args.dump {
        for tap in ir.taps() {
            println!("{tap}");
        }
        return Ok(());
    }

    for line in summary(&ir, length, decay, gain, args.head) {
        println!("{line}");
    }
    Ok(())
}

fn summary(ir: &ImpulseResponse, length: usize, decay: f32, gain: f32, head: usize) -> Vec<String> {
    let taps = ir.taps();
    let rms = (ir.energy() / taps.len() as f32).sqrt();
    let sum: f32 = taps.iter().sum();

    let mut lines = vec![
        "Impulse Response".to_string(),
        "================".to_string(),
        format!("  Noise samples: {length}"),
        format!("  Decay factor:  {decay:.2}"),
        format!("  Taps:          {}", taps.len()),
        format!("  Peak:          {:.4}", ir.peak()),
        format!("  Energy:        {:.4}", ir.energy()),
        format!("  RMS:           {rms:.4}"),
    ];
    if gain < 1.0 {
        lines.push(format!("  DC gain:       {:.4} (feedback {gain:.2})", sum / (1.0 - gain)));
    } else {
        lines.push("  DC gain:       unbounded (feedback 1.00)".to_string());
    }

    let shown = head.min(taps.len());
    if shown > 0 {
        let head: Vec<String> = taps[..shown].iter().map(|t| format!("{t:+.4}")).collect();
        lines.push(format!("  First {shown}:       {}", head.join(" ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_shape() {
        let ir = ImpulseResponse::from_taps(vec![1.0, -0.5, 0.25]);
        let lines = summary(&ir, 2, 0.5, 0.5, 2);
        assert!(lines.contains(&"  Taps:          3".to_string()));
        assert!(lines.contains(&"  Peak:          1.0000".to_string()));
        assert!(lines.contains(&"  DC gain:       1.5000 (feedback 0.50)".to_string()));
        assert!(lines.last().unwrap().ends_with("+1.0000 -0.5000"));
    }

    #[test]
    fn unity_feedback_is_flagged() {
        let ir = ImpulseResponse::from_taps(vec![1.0]);
        let lines = summary(&ir, 1, 0.0, 1.0, 0);
        assert!(lines.iter().any(|l| l.contains("unbounded")));
    }
}
