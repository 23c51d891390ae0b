//! Stream configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! sample_rate = 48000
//! block_size = 1024
//! output_device = "USB"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Default interleaved channel count.
pub const DEFAULT_CHANNELS: u16 = 2;
/// Default block size in frames per callback.
pub const DEFAULT_BLOCK_SIZE: u32 = 8192;

/// Duplex stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Sample rate in Hz, shared by input and output.
    pub sample_rate: u32,
    /// Channel count, shared by input and output.
    pub channels: u16,
    /// Frames per callback.
    pub block_size: u32,
    /// Input device name, partial name, or index (uses default if `None`).
    pub input_device: Option<String>,
    /// Output device name, partial name, or index (uses default if `None`).
    pub output_device: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            block_size: DEFAULT_BLOCK_SIZE,
            input_device: None,
            output_device: None,
        }
    }
}

impl StreamConfig {
    /// Parse a configuration from a TOML string and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: StreamConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations no device can honor.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::UnsupportedConfig("sample_rate must be > 0".into()));
        }
        if self.channels == 0 {
            return Err(Error::UnsupportedConfig("channels must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(Error::UnsupportedConfig("block_size must be > 0".into()));
        }
        Ok(())
    }

    /// Interleaved samples in one block.
    pub fn block_samples(&self) -> usize {
        self.block_size as usize * self.channels as usize
    }

    /// Wall-clock time one block covers; the callback must finish within it.
    pub fn deadline(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(u64::from(self.block_size) * 1_000_000_000 / u64::from(self.sample_rate))
    }
}
