//! Modulation sources and routing.
//!
//! Each voice owns a [`voice_matrix::VoiceModMatrix`] that starts every block
//! from the zone's stored values and adds routed source contributions on top.
//! Groups have a smaller matrix of their own.

pub mod group_matrix;
pub mod step_lfo;
pub mod voice_matrix;

pub use group_matrix::{GroupModMatrix, GroupModRoute, GroupModSource, GroupModTarget};
pub use step_lfo::{LfoPreset, StepLfo, StepLfoStorage, TriggerMode};
pub use voice_matrix::{ModRoute, VoiceModMatrix, VoiceModSource, VoiceModTarget};

pub const STEP_LFO_STEPS: usize = 32;
