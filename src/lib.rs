//! saavy_sampler - a realtime-safe polyphonic sample playback engine.
//!
//! The engine is split across two threads. The audio thread owns the
//! [`Engine`] and calls [`Engine::process_audio`] once per fixed block. The
//! control thread owns the [`MessageController`] returned alongside the engine
//! and talks to the audio thread only through lock-free queues.
//!
//! ```text
//!   Patch ─┬─ Part ─┬─ Group ─┬─ Zone ── Voice (from the engine pool)
//!          │        │         └─ Zone ── Voice
//!          │        └─ Group ...
//!          └─ Busses (part, aux, main)
//! ```

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod generator;
pub mod messaging;
pub mod modulation;
pub mod processor;
pub mod sample;
pub mod voice;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, SampleError};
pub use messaging::MessageController;

/// Samples per audio block. Everything in the engine runs in blocks of this size.
pub const BLOCK_SIZE: usize = 16;
/// Block length when a voice runs its generator at twice the engine rate.
pub const BLOCK_SIZE_OS: usize = BLOCK_SIZE * 2;
pub(crate) const BLOCK_SIZE_INV: f32 = 1.0 / BLOCK_SIZE as f32;

pub const MAX_VOICES: usize = 64;
pub const NUM_PARTS: usize = 16;
pub const NUM_AUX: usize = 4;
pub const PROCESSORS_PER_ZONE: usize = 4;
pub const LFOS_PER_ZONE: usize = 3;
pub const LFOS_PER_GROUP: usize = 3;
pub const EGS_PER_GROUP: usize = 2;
pub const MAX_SAMPLES_PER_ZONE: usize = 16;
pub const MOD_MATRIX_SLOTS: usize = 6;
