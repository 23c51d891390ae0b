//! Audio I/O layer for the Sillage reverb.
//!
//! This crate provides:
//!
//! - **Stream configuration**: [`StreamConfig`], optionally loaded from TOML
//! - **Callback driver**: [`AudioCallbackDriver`] runs the reverb engine once
//!   per audio block and records [`DriverStats`]
//! - **Backends**: the [`AudioBackend`] trait and its cpal implementation,
//!   [`CpalBackend`], which pairs an input and an output device into one
//!   duplex callback
//! - **Device listing**: [`list_devices`] and [`default_device`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sillage_core::ReverbParameterStore;
//! use sillage_io::{AudioBackend, AudioCallbackDriver, CpalBackend, StreamConfig};
//!
//! let config = StreamConfig::default();
//! let store = Arc::new(ReverbParameterStore::new());
//! let mut driver = AudioCallbackDriver::new(Arc::clone(&store), &config);
//!
//! let backend = CpalBackend::new();
//! let _stream = backend.build_duplex_stream(
//!     &config,
//!     Box::new(move |input, output, info| driver.process(input, output, info)),
//!     Box::new(|err| tracing::error!(%err, "stream error")),
//! )?;
//!
//! store.set_enabled(true);
//! ```

pub mod backend;
mod config;
pub mod cpal_backend;
mod driver;
mod stream;

pub use backend::{AudioBackend, DuplexCallback, ErrorCallback, StreamHandle};
pub use config::{DEFAULT_BLOCK_SIZE, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, StreamConfig};
pub use cpal_backend::CpalBackend;
pub use driver::{AudioCallbackDriver, CallbackInfo, DriverStats, StatsSnapshot, StreamStatus};
pub use stream::{AudioDevice, default_device, list_devices};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device rejected the requested stream configuration.
    #[error("Unsupported stream configuration: {0}")]
    UnsupportedConfig(String),

    /// Stream configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
