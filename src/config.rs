//! Engine configuration.
//!
//! Everything here is read once on the control thread when the engine is
//! built. The audio thread never looks at the config again except for the
//! values it copies into its own state.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_VOICES;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Engine output rate in Hz.
    pub sample_rate: f32,
    /// How many voice slots the engine scans when allocating. Clamped to `MAX_VOICES`.
    pub max_voices: usize,
    /// Capacity of each direction of the control/audio message queues.
    pub message_queue_capacity: usize,
    /// Refresh the shared voice display every this many blocks even when nothing changed.
    pub voice_display_update_every: u32,
    /// Publish per-voice sample positions to the shared UI state.
    pub send_sample_position: bool,
    /// Number of preallocated memory blocks for processors that need delay lines.
    pub memory_pool_blocks: usize,
    /// Length in samples of each memory pool block.
    pub memory_pool_block_len: usize,
    /// Seed for the engine's random source (random LFO starts, noise presets).
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_voices: MAX_VOICES,
            message_queue_capacity: 1024,
            voice_display_update_every: 64,
            send_sample_position: true,
            memory_pool_blocks: MAX_VOICES * 2,
            memory_pool_block_len: 8192,
            rng_seed: 0x5eed_5a3b,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Voice slot count actually used by the engine.
    pub fn voice_limit(&self) -> usize {
        self.max_voices.clamp(1, MAX_VOICES)
    }

    /// Sample rate with nonsense values replaced by the default.
    pub fn effective_sample_rate(&self) -> f32 {
        if self.sample_rate.is_finite() && self.sample_rate >= 1_000.0 {
            self.sample_rate
        } else {
            48_000.0
        }
    }
}
