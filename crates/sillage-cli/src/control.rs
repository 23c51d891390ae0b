//! Line-oriented control surface.
//!
//! One command per line on stdin:
//!
//! ```text
//! gain 0.6          set a parameter directly (clamped)
//! slider length 30  set through the 0..=100 slider mapping (here 300 samples)
//! toggle | on | off switch the reverb
//! show              print every parameter
//! stats             print audio callback counters
//! help | quit
//! ```
//!
//! Parsing and execution are separate from stdin so both can be tested
//! without a terminal or an audio device.

use sillage_core::{EffectParameters, Param, ReverbParameterStore, SLIDER_POSITIONS};
use sillage_io::DriverStats;

/// A parsed control line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Set a parameter to a plain value.
    Set(Param, f32),
    /// Move a parameter's slider to an integer position.
    Slider(Param, u32),
    /// Flip the enabled state.
    Toggle,
    /// Force the enabled state.
    Enable(bool),
    /// Print the label table.
    Show,
    /// Print driver counters.
    Stats,
    /// Print command help.
    Help,
    /// Leave the control loop.
    Quit,
}

/// Why a control line was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// First word is not a known command or parameter.
    #[error("unknown command '{0}' (type 'help')")]
    UnknownCommand(String),
    /// `slider` named something that is not a parameter.
    #[error("unknown parameter '{0}' (expected gain, length, cutoff, or decay)")]
    UnknownParam(String),
    /// A command that takes a value got none.
    #[error("'{0}' needs a value")]
    MissingValue(String),
    /// The value did not parse as a number.
    #[error("invalid value '{0}'")]
    InvalidValue(String),
    /// Extra words after a complete command.
    #[error("unexpected input '{0}'")]
    TrailingInput(String),
}

/// What the control loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print these lines and keep going.
    Lines(Vec<String>),
    /// Stop.
    Quit,
}

const HELP: &[&str] = &[
    "Commands:",
    "  gain <0..1>            feedback gain",
    "  length <samples>       impulse length (0 bypasses)",
    "  cutoff <0..1>          cutoff (display only)",
    "  decay <0..1>           decay factor",
    "  slider <param> <0..100>",
    "  toggle | on | off      switch the reverb",
    "  show                   current settings",
    "  stats                  audio callback counters",
    "  quit",
];

/// Parse one line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ControlCommand>, ParseError> {
    let line = line.split('#').next().unwrap_or_default();
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let head = head.to_ascii_lowercase();

    let command = match head.as_str() {
        "toggle" | "t" => ControlCommand::Toggle,
        "on" | "enable" => ControlCommand::Enable(true),
        "off" | "disable" | "bypass" => ControlCommand::Enable(false),
        "show" | "params" => ControlCommand::Show,
        "stats" => ControlCommand::Stats,
        "help" | "?" => ControlCommand::Help,
        "quit" | "exit" | "q" => ControlCommand::Quit,
        "slider" => {
            let name = words
                .next()
                .ok_or_else(|| ParseError::MissingValue("slider".into()))?;
            let param =
                Param::from_id(name).ok_or_else(|| ParseError::UnknownParam(name.to_string()))?;
            let raw = words
                .next()
                .ok_or_else(|| ParseError::MissingValue(format!("slider {name}")))?;
            let position = raw
                .parse::<u32>()
                .map_err(|_| ParseError::InvalidValue(raw.to_string()))?;
            ControlCommand::Slider(param, position.min(SLIDER_POSITIONS))
        }
        other => {
            let param =
                Param::from_id(other).ok_or_else(|| ParseError::UnknownCommand(other.to_string()))?;
            let raw = words
                .next()
                .ok_or_else(|| ParseError::MissingValue(other.to_string()))?;
            let value = raw
                .parse::<f32>()
                .map_err(|_| ParseError::InvalidValue(raw.to_string()))?;
            ControlCommand::Set(param, value)
        }
    };

    if let Some(extra) = words.next() {
        return Err(ParseError::TrailingInput(extra.to_string()));
    }
    Ok(Some(command))
}

/// Apply `command` to the store and describe the result.
pub fn execute(
    command: ControlCommand,
    store: &ReverbParameterStore,
    stats: Option<&DriverStats>,
) -> Reply {
    let lines = match command {
        ControlCommand::Set(param, value) => {
            store.set(param, value);
            vec![param_label(param, &store.params())]
        }
        ControlCommand::Slider(param, position) => {
            store.set(param, param.descriptor().from_slider(position));
            vec![param_label(param, &store.params())]
        }
        ControlCommand::Toggle => vec![enabled_label(store.toggle_enabled())],
        ControlCommand::Enable(enabled) => {
            store.set_enabled(enabled);
            vec![enabled_label(enabled)]
        }
        ControlCommand::Show => label_table(&store.params()),
        ControlCommand::Stats => stats_lines(store, stats),
        ControlCommand::Help => HELP.iter().map(ToString::to_string).collect(),
        ControlCommand::Quit => return Reply::Quit,
    };
    Reply::Lines(lines)
}

/// Display line for one parameter, e.g. `Reverb Gain: 0.80`.
pub fn param_label(param: Param, params: &EffectParameters) -> String {
    let name = param.descriptor().name;
    match param {
        Param::Length => format!("{}: {}", name, params.length_samples),
        _ => format!("{}: {:.2}", name, params.get(param)),
    }
}

/// Display line for the enabled state.
pub fn enabled_label(enabled: bool) -> String {
    format!("Reverb: {}", if enabled { "on" } else { "off" })
}

/// Every parameter plus the enabled state, in display order.
pub fn label_table(params: &EffectParameters) -> Vec<String> {
    Param::ALL
        .into_iter()
        .map(|p| param_label(p, params))
        .chain(std::iter::once(enabled_label(params.enabled)))
        .collect()
}

fn stats_lines(store: &ReverbParameterStore, stats: Option<&DriverStats>) -> Vec<String> {
    let snapshot = store.current_snapshot();
    let mut lines = vec![
        format!(
            "Snapshot revision: {} (impulse {})",
            snapshot.revision, snapshot.impulse_revision
        ),
        format!(
            "Impulse taps: {}",
            snapshot.impulse.as_ref().map_or(0, |ir| ir.len())
        ),
    ];
    match stats {
        Some(stats) => {
            let s = stats.snapshot();
            lines.push(format!("Blocks: {}", s.blocks));
            lines.push(format!("Faults: {}", s.faults));
            lines.push(format!("Deadline misses: {}", s.deadline_misses));
            lines.push(format!(
                "Worst callback: {:.2} ms",
                s.worst_callback.as_secs_f64() * 1000.0
            ));
            lines.push(match s.playback_delay {
                Some(delay) => format!("Playback delay: {:.2} ms", delay.as_secs_f64() * 1000.0),
                None => "Playback delay: unknown".to_string(),
            });
        }
        None => lines.push("No audio stream".to_string()),
    }
    lines
}
