//! Audio device listing command.

use clap::{Args, Subcommand};
use sillage_io::{AudioBackend, AudioDevice, CpalBackend};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all available audio devices
    List,

    /// Show default device information
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let backend = CpalBackend::new();
    let lines = match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => list_lines(&backend)?,
        DevicesCommand::Info => info_lines(&backend)?,
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn list_lines(backend: &dyn AudioBackend) -> sillage_io::Result<Vec<String>> {
    let devices = backend.list_devices()?;
    if devices.is_empty() {
        return Ok(vec!["No audio devices found.".to_string()]);
    }

    let mut lines = vec![
        format!("Available Audio Devices ({})", backend.name()),
        "=======================".to_string(),
        String::new(),
    ];

    let inputs: Vec<_> = devices.iter().filter(|d| d.is_input).collect();
    if !inputs.is_empty() {
        lines.push("Input Devices:".to_string());
        for (idx, device) in inputs.iter().enumerate() {
            let also = if device.is_output { " (also output)" } else { "" };
            lines.push(format!("  [{}] {}{}", idx, describe(device), also));
        }
        lines.push(String::new());
    }

    let outputs: Vec<_> = devices.iter().filter(|d| d.is_output).collect();
    if !outputs.is_empty() {
        lines.push("Output Devices:".to_string());
        for (idx, device) in outputs.iter().enumerate() {
            let also = if device.is_input { " (also input)" } else { "" };
            lines.push(format!("  [{}] {}{}", idx, describe(device), also));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "Total: {} input(s), {} output(s)",
        inputs.len(),
        outputs.len()
    ));
    lines.push(String::new());
    lines.push("Tip: Use device index or partial name with --input/--output:".to_string());
    lines.push("  sillage run --input 0 --output 0".to_string());
    lines.push("  sillage run --input \"USB\" --output \"USB\" --enabled".to_string());
    Ok(lines)
}

fn info_lines(backend: &dyn AudioBackend) -> sillage_io::Result<Vec<String>> {
    let show = |device: Option<AudioDevice>| {
        device.map_or_else(|| "None".to_string(), |d| describe(&d))
    };
    Ok(vec![
        "Default Audio Devices".to_string(),
        "=====================".to_string(),
        String::new(),
        format!("Default Input:  {}", show(backend.default_input_device()?)),
        format!("Default Output: {}", show(backend.default_output_device()?)),
    ])
}

/// `Name (48000 Hz, 2 ch)`; channel count omitted when the device will not say.
fn describe(device: &AudioDevice) -> String {
    if device.default_channels == 0 {
        format!("{} ({} Hz)", device.name, device.default_sample_rate)
    } else {
        format!(
            "{} ({} Hz, {} ch)",
            device.name, device.default_sample_rate, device.default_channels
        )
    }
}
