//! Real-time reverb command.
//!
//! Audio runs on the backend's callback thread. The main thread owns the
//! control loop: it reads commands forwarded from a stdin reader thread,
//! publishes parameter changes, reclaims retired snapshots, and reports new
//! stream faults.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded, never};
use sillage_core::{EffectParameters, GaussianNoise, ReverbParameterStore};
use sillage_io::{
    AudioBackend, AudioCallbackDriver, CallbackInfo, CpalBackend, DriverStats, StatsSnapshot,
    StreamConfig,
};

use crate::control::{self, Reply};

/// How often the control loop wakes when no command arrives.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Args)]
pub struct RunArgs {
    /// Stream configuration file (TOML); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input device (index, name, or partial name)
    #[arg(short, long)]
    input: Option<String>,

    /// Output device (index, name, or partial name)
    #[arg(short, long)]
    output: Option<String>,

    /// Sample rate in Hz [default: 44100]
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Channel count [default: 2]
    #[arg(long)]
    channels: Option<u16>,

    /// Block size in frames [default: 8192]
    #[arg(long)]
    block_size: Option<u32>,

    /// Initial feedback gain (0..1)
    #[arg(long)]
    gain: Option<f32>,

    /// Initial impulse length in samples
    #[arg(long)]
    length: Option<usize>,

    /// Initial cutoff (0..1)
    #[arg(long)]
    cutoff: Option<f32>,

    /// Initial decay factor (0..1)
    #[arg(long)]
    decay: Option<f32>,

    /// Start with the reverb switched on
    #[arg(long)]
    enabled: bool,

    /// Seed for impulse noise, for reproducible responses
    #[arg(long)]
    seed: Option<u64>,
}

impl RunArgs {
    fn stream_config(&self) -> anyhow::Result<StreamConfig> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => StreamConfig::default(),
        };
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(channels) = self.channels {
            config.channels = channels;
        }
        if let Some(block) = self.block_size {
            config.block_size = block;
        }
        if self.input.is_some() {
            config.input_device.clone_from(&self.input);
        }
        if self.output.is_some() {
            config.output_device.clone_from(&self.output);
        }
        config.validate()?;
        Ok(config)
    }

    fn initial_params(&self) -> EffectParameters {
        let defaults = EffectParameters::default();
        EffectParameters {
            gain: self.gain.unwrap_or(defaults.gain),
            length_samples: self.length.unwrap_or(defaults.length_samples),
            cutoff: self.cutoff.unwrap_or(defaults.cutoff),
            decay: self.decay.unwrap_or(defaults.decay),
            enabled: self.enabled,
        }
        .clamped()
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.stream_config()?;
    let params = args.initial_params();
    let noise = match args.seed {
        Some(seed) => GaussianNoise::seeded(seed),
        None => GaussianNoise::from_entropy(),
    };
    let store = Arc::new(ReverbParameterStore::with_params(params, noise));

    let mut driver = AudioCallbackDriver::new(Arc::clone(&store), &config);
    let stats = driver.stats();

    println!("Sillage reverb");
    println!("  Input:  {}", config.input_device.as_deref().unwrap_or("default"));
    println!("  Output: {}", config.output_device.as_deref().unwrap_or("default"));
    println!("  Sample rate: {} Hz", config.sample_rate);
    println!("  Channels: {}", config.channels);
    println!(
        "  Block size: {} frames ({:.1} ms)",
        config.block_size,
        config.deadline().as_secs_f64() * 1000.0
    );
    for line in control::label_table(&store.params()) {
        println!("  {line}");
    }
    println!("\nType 'help' for commands, Ctrl+C to stop.\n");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let backend = CpalBackend::new();
    let _stream = backend.build_duplex_stream(
        &config,
        Box::new(move |input: &[f32], output: &mut [f32], info: CallbackInfo| {
            driver.process(input, output, info);
        }),
        Box::new(|err: &str| tracing::error!(error = err, "audio stream error")),
    )?;

    control_loop(&store, &stats, &running, spawn_stdin_reader());

    println!("Stopping...");
    Ok(())
}

/// Forward stdin lines over a channel; the channel disconnects on EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded(16);
    let spawned = thread::Builder::new()
        .name("sillage-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "no stdin reader; control commands disabled");
    }
    rx
}

fn control_loop(
    store: &ReverbParameterStore,
    stats: &DriverStats,
    running: &AtomicBool,
    mut commands: Receiver<String>,
) {
    let mut reported = StatsSnapshot::default();

    while running.load(Ordering::SeqCst) {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(line) => match control::parse(&line) {
                Ok(Some(command)) => match control::execute(command, store, Some(stats)) {
                    Reply::Lines(lines) => {
                        for line in lines {
                            println!("{line}");
                        }
                    }
                    Reply::Quit => break,
                },
                Ok(None) => {}
                Err(e) => println!("{e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("stdin closed; running until Ctrl+C");
                commands = never();
            }
        }

        store.collect_garbage();
        reported = report_new_faults(stats.snapshot(), reported);
    }
}

/// Log counters that grew since the last report and return the new baseline.
fn report_new_faults(current: StatsSnapshot, previous: StatsSnapshot) -> StatsSnapshot {
    if current.deadline_misses > previous.deadline_misses {
        tracing::warn!(
            new = current.deadline_misses - previous.deadline_misses,
            total = current.deadline_misses,
            worst_ms = current.worst_callback.as_secs_f64() * 1000.0,
            "audio callback missed its deadline"
        );
    }
    if current.faults > previous.faults {
        tracing::warn!(
            new = current.faults - previous.faults,
            total = current.faults,
            "stream faults (input overflow, underflow or backend error)"
        );
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> RunArgs {
        Harness::parse_from(std::iter::once("sillage").chain(argv.iter().copied())).args
    }

    #[test]
    fn defaults_without_flags() {
        let args = parse(&[]);
        assert_eq!(args.stream_config().unwrap(), StreamConfig::default());
        assert_eq!(args.initial_params(), EffectParameters::default());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stream.toml");
        std::fs::write(&path, "sample_rate = 48000\nblock_size = 1024").unwrap();

        let args = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--block-size",
            "256",
            "--output",
            "USB",
        ]);
        let config = args.stream_config().unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.block_size, 256);
        assert_eq!(config.output_device.as_deref(), Some("USB"));
        assert_eq!(config.input_device, None);
    }

    #[test]
    fn initial_params_are_clamped() {
        let args = parse(&["--gain", "3", "--length", "1000000", "--decay", "0.3", "--enabled"]);
        let p = args.initial_params();
        assert_eq!(p.gain, 1.0);
        assert_eq!(p.length_samples, sillage_core::MAX_LENGTH_SAMPLES);
        assert_eq!(p.decay, 0.3);
        assert!(p.enabled);
    }

    #[test]
    fn invalid_stream_flags_are_rejected() {
        assert!(parse(&["--channels", "0"]).stream_config().is_err());
    }

    #[test]
    fn control_loop_applies_commands_until_quit() {
        let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(1));
        let stats = DriverStats::default();
        let running = AtomicBool::new(true);
        let (tx, rx) = bounded(8);
        for line in ["gain 0.25", "slider length 10", "bogus", "on", "quit", "gain 0.9"] {
            tx.send(line.to_string()).unwrap();
        }

        control_loop(&store, &stats, &running, rx);

        let p = store.params();
        assert_eq!(p.gain, 0.25);
        assert_eq!(p.length_samples, 100);
        assert!(p.enabled);
    }

    #[test]
    fn control_loop_stops_when_flag_clears() {
        let store = ReverbParameterStore::with_noise(GaussianNoise::seeded(1));
        let stats = DriverStats::default();
        let running = AtomicBool::new(false);
        let (_tx, rx) = bounded::<String>(1);
        control_loop(&store, &stats, &running, rx);
        assert_eq!(store.params(), EffectParameters::default());
    }

    #[test]
    fn fault_report_advances_baseline() {
        let now = StatsSnapshot {
            blocks: 10,
            faults: 2,
            deadline_misses: 1,
            worst_callback: Duration::from_millis(3),
            playback_delay: None,
        };
        assert_eq!(report_new_faults(now, StatsSnapshot::default()), now);
    }
}
