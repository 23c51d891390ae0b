//! Pluggable audio backend abstraction.
//!
//! The reverb needs exactly one kind of stream: duplex, where every callback
//! gets a block of captured input and an output buffer of the same shape to
//! fill. [`AudioBackend`] hides how a platform provides that. The cpal
//! implementation pairs a separate input and output device through a
//! lock-free ring; a test backend can simply call the callback in a loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │  sillage-cli (control surface)   │
//! └──────────────┬───────────────────┘
//!                │ build_duplex_stream
//!                ▼
//! ┌──────────────────────────────────┐
//! │        AudioBackend trait        │
//! └──────────────┬───────────────────┘
//!                │ calls per block
//!                ▼
//! ┌──────────────────────────────────┐
//! │  DuplexCallback (driver.process) │
//! └──────────────────────────────────┘
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe, and streams are
//! returned as a type-erased [`StreamHandle`] that stops audio on drop.

use crate::{AudioDevice, CallbackInfo, Result, StreamConfig};

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops audio.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, keeping it alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Duplex callback signature.
///
/// Called on the real-time audio thread with interleaved input
/// (`[L0, R0, L1, R1, ...]`), the interleaved output buffer to fill, and
/// [`CallbackInfo`] describing the block.
///
/// ## Real-Time Safety
///
/// Implementations must not allocate, lock mutexes, or perform I/O.
pub type DuplexCallback = Box<dyn FnMut(&[f32], &mut [f32], CallbackInfo) + Send>;

/// Error callback signature.
///
/// Called when the backend reports a streaming error. Receives a
/// human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable audio backend.
pub trait AudioBackend: Send {
    /// Human-readable name of this backend (e.g., "cpal").
    fn name(&self) -> &str;

    /// List all available audio devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Default input device, if any.
    fn default_input_device(&self) -> Result<Option<AudioDevice>>;

    /// Build and start a duplex stream.
    ///
    /// Input and output share `config.sample_rate`, `config.channels`, and
    /// `config.block_size`. The returned [`StreamHandle`] keeps both
    /// directions alive.
    fn build_duplex_stream(
        &self,
        config: &StreamConfig,
        callback: DuplexCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{:?}", handle).contains("StreamHandle"));
    }
}
