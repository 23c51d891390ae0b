//! Per-block audio callback driver.
//!
//! [`AudioCallbackDriver`] is the only code that runs on the audio thread. Each
//! block it loads the latest [`ParameterSnapshot`](sillage_core::ParameterSnapshot)
//! once, runs the engine, and updates [`DriverStats`]. A parameter change
//! published mid-block is therefore picked up by the next block, never halfway
//! through one.
//!
//! Stream faults reported by the backend are counted and processing carries
//! on with whatever input arrived. Only the first fault of a stream is logged
//! from the audio thread; later ones are left to whoever polls
//! [`DriverStats`], so a flapping device cannot stall the callback on a slow
//! log sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use sillage_core::{ReverbParameterStore, StreamingConvolutionEngine};

use crate::StreamConfig;

/// Stream condition flags reported alongside a block.
///
/// Bitfield; combine with [`union`](Self::union) or `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamStatus(u8);

impl StreamStatus {
    /// Nothing unusual happened.
    pub const NONE: Self = Self(0);
    /// Captured input was dropped because the capture ring was full.
    pub const INPUT_OVERFLOW: Self = Self(1 << 0);
    /// Not enough captured input arrived; the gap was filled with silence.
    pub const INPUT_UNDERFLOW: Self = Self(1 << 1);
    /// The backend reported a stream error since the previous block.
    pub const BACKEND_ERROR: Self = Self(1 << 2);

    /// Returns `true` if no flag is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Raw bit representation.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for StreamStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for StreamStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Timing and status information for one callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallbackInfo {
    /// Frames the backend asked for.
    pub frames: usize,
    /// Conditions observed since the previous block.
    pub status: StreamStatus,
    /// Estimated time until the first output frame is heard, when known.
    pub playback_delay: Option<Duration>,
}

/// Counters shared between the audio callback and the control path.
///
/// All fields are relaxed atomics: values are diagnostics, not
/// synchronization.
#[derive(Debug, Default)]
pub struct DriverStats {
    blocks: AtomicU64,
    faults: AtomicU64,
    deadline_misses: AtomicU64,
    worst_callback_us: AtomicU64,
    // Microseconds plus one; zero means the backend gave no estimate.
    playback_delay_us: AtomicU64,
}

/// Point-in-time copy of [`DriverStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Blocks processed.
    pub blocks: u64,
    /// Blocks that arrived with a non-empty [`StreamStatus`].
    pub faults: u64,
    /// Blocks whose processing took longer than the block duration.
    pub deadline_misses: u64,
    /// Longest single callback observed.
    pub worst_callback: Duration,
    /// Latest output latency estimate from the backend, if it gives one.
    pub playback_delay: Option<Duration>,
}

impl DriverStats {
    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks: self.blocks.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            deadline_misses: self.deadline_misses.load(Ordering::Relaxed),
            worst_callback: Duration::from_micros(self.worst_callback_us.load(Ordering::Relaxed)),
            playback_delay: match self.playback_delay_us.load(Ordering::Relaxed) {
                0 => None,
                stored => Some(Duration::from_micros(stored - 1)),
            },
        }
    }

    /// Count a faulty block; returns `true` for the first one.
    fn record_fault(&self) -> bool {
        self.faults.fetch_add(1, Ordering::Relaxed) == 0
    }

    fn record_playback_delay(&self, delay: Option<Duration>) {
        let stored = delay.map_or(0, |d| {
            u64::try_from(d.as_micros())
                .unwrap_or(u64::MAX - 1)
                .saturating_add(1)
        });
        self.playback_delay_us.store(stored, Ordering::Relaxed);
    }

    fn record(&self, elapsed: Duration, deadline: Duration) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.worst_callback_us.fetch_max(micros, Ordering::Relaxed);
        if !deadline.is_zero() && elapsed > deadline {
            self.deadline_misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Audio-thread side of the reverb.
///
/// Owns the engine (and with it all filter state); shares the parameter store
/// and statistics with the control path.
///
/// ## Real-Time Safety
///
/// [`process`](Self::process) does not allocate or lock. The engine's delay
/// lines are sized at construction for the longest response the store can
/// publish.
pub struct AudioCallbackDriver {
    store: Arc<ReverbParameterStore>,
    engine: StreamingConvolutionEngine,
    stats: Arc<DriverStats>,
    deadline: Duration,
}

impl AudioCallbackDriver {
    /// Driver for a stream described by `config`.
    pub fn new(store: Arc<ReverbParameterStore>, config: &StreamConfig) -> Self {
        let engine = StreamingConvolutionEngine::with_default_capacity(usize::from(config.channels));
        Self::with_engine(store, engine, config.deadline())
    }

    /// Driver around a preconfigured engine. A zero `deadline` disables
    /// deadline-miss counting.
    pub fn with_engine(
        store: Arc<ReverbParameterStore>,
        engine: StreamingConvolutionEngine,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            engine,
            stats: Arc::new(DriverStats::default()),
            deadline,
        }
    }

    /// Shared handle to the driver's counters.
    pub fn stats(&self) -> Arc<DriverStats> {
        Arc::clone(&self.stats)
    }

    /// Per-block time budget.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Process one interleaved block.
    ///
    /// Output samples beyond `input.len()` are filled with silence.
    pub fn process(&mut self, input: &[f32], output: &mut [f32], info: CallbackInfo) {
        let started = Instant::now();

        if !info.status.is_empty() && self.stats.record_fault() {
            tracing::warn!(
                status = info.status.bits(),
                frames = info.frames,
                "stream fault; continuing"
            );
        }
        self.stats.record_playback_delay(info.playback_delay);

        let len = input.len().min(output.len());
        let snapshot = self.store.load();
        self.engine
            .process(&input[..len], &mut output[..len], &snapshot);
        drop(snapshot);
        output[len..].fill(0.0);

        self.stats.record(started.elapsed(), self.deadline);
    }
}

impl std::fmt::Debug for AudioCallbackDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCallbackDriver")
            .field("channels", &self.engine.channel_count())
            .field("deadline", &self.deadline)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sillage_core::GaussianNoise;

    fn driver() -> (Arc<ReverbParameterStore>, AudioCallbackDriver) {
        let store = Arc::new(ReverbParameterStore::with_noise(GaussianNoise::seeded(1)));
        let engine = StreamingConvolutionEngine::new(2, 128);
        let driver = AudioCallbackDriver::with_engine(Arc::clone(&store), engine, Duration::ZERO);
        (store, driver)
    }

    #[test]
    fn status_flags() {
        let s = StreamStatus::INPUT_OVERFLOW | StreamStatus::BACKEND_ERROR;
        assert!(s.contains(StreamStatus::INPUT_OVERFLOW));
        assert!(!s.contains(StreamStatus::INPUT_UNDERFLOW));
        assert!(!s.is_empty());
        assert!(StreamStatus::default().is_empty());

        let mut t = StreamStatus::NONE;
        t |= StreamStatus::INPUT_UNDERFLOW;
        assert_eq!(t.bits(), 0b10);
    }

    #[test]
    fn faults_are_counted_and_processing_continues() {
        let (_store, mut driver) = driver();
        let input = [0.25; 8];
        let mut output = [0.0; 8];
        let info = CallbackInfo {
            frames: 4,
            status: StreamStatus::INPUT_UNDERFLOW,
            playback_delay: None,
        };
        driver.process(&input, &mut output, info);
        driver.process(&input, &mut output, CallbackInfo::default());

        let stats = driver.stats().snapshot();
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.faults, 1);
        assert_eq!(stats.playback_delay, None);
        assert_eq!(stats.deadline_misses, 0);
        assert_eq!(output, input);
    }

    #[test]
    fn only_the_first_fault_is_reported_inline() {
        let stats = DriverStats::default();
        assert!(stats.record_fault());
        assert!(!stats.record_fault());
        assert!(!stats.record_fault());
        assert_eq!(stats.snapshot().faults, 3);
    }

    #[test]
    fn latest_playback_delay_is_kept() {
        let (_store, mut driver) = driver();
        let input = [0.0; 4];
        let mut output = [0.0; 4];
        let info = CallbackInfo {
            frames: 2,
            status: StreamStatus::NONE,
            playback_delay: Some(Duration::from_micros(5_800)),
        };
        driver.process(&input, &mut output, info);
        assert_eq!(
            driver.stats().snapshot().playback_delay,
            Some(Duration::from_micros(5_800))
        );

        let zero = CallbackInfo {
            playback_delay: Some(Duration::ZERO),
            ..info
        };
        driver.process(&input, &mut output, zero);
        assert_eq!(driver.stats().snapshot().playback_delay, Some(Duration::ZERO));

        driver.process(&input, &mut output, CallbackInfo::default());
        assert_eq!(driver.stats().snapshot().playback_delay, None);
    }

    #[test]
    fn long_output_tail_is_silenced() {
        let (_store, mut driver) = driver();
        let input = [0.5; 4];
        let mut output = [9.0; 8];
        driver.process(&input, &mut output, CallbackInfo::default());
        assert_eq!(output, [0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn deadline_misses_are_counted() {
        let stats = DriverStats::default();
        stats.record(Duration::from_millis(5), Duration::from_millis(10));
        stats.record(Duration::from_millis(12), Duration::from_millis(10));
        stats.record(Duration::from_millis(50), Duration::ZERO);
        let s = stats.snapshot();
        assert_eq!(s.blocks, 3);
        assert_eq!(s.deadline_misses, 1);
        assert_eq!(s.worst_callback, Duration::from_millis(50));
    }

    #[test]
    fn deadline_from_config() {
        let store = Arc::new(ReverbParameterStore::with_noise(GaussianNoise::seeded(1)));
        let config = StreamConfig {
            sample_rate: 1000,
            block_size: 250,
            ..StreamConfig::default()
        };
        let driver = AudioCallbackDriver::new(store, &config);
        assert_eq!(driver.deadline(), Duration::from_millis(250));
    }
}
