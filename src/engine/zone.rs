//! A zone: one sample (or a set of round-robin slots) with its mapping,
//! processors, modulation settings and the voices currently playing it.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::dsp::envelope::AdsrStorage;
use crate::dsp::mix::{accumulate_stereo, clear_stereo, StereoBlock};
use crate::engine::bus::{BusAddress, Busses};
use crate::engine::keyboard::{KeyboardRange, VelocityRange};
use crate::engine::memory_pool::MemoryPool;
use crate::engine::next_id;
use crate::modulation::step_lfo::StepLfoStorage;
use crate::modulation::voice_matrix::VoiceRoutingTable;
use crate::processor::ProcessorStorage;
use crate::sample::{Sample, SampleId, SampleManager};
use crate::voice::{Voice, VoiceContext, VoiceId};
use crate::{BLOCK_SIZE, LFOS_PER_ZONE, MAX_SAMPLES_PER_ZONE, MAX_VOICES, PROCESSORS_PER_ZONE};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(pub u64);

/// How the sample is triggered and what gates the amplitude envelope.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Starts on note-on; the note gates the envelope.
    #[default]
    Normal,
    /// Starts on note-on; sample playback gates the envelope.
    OneShot,
    /// Starts on note-off; sample playback gates the envelope.
    OnRelease,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Once the loop is entered, stay in it for the life of the voice.
    #[default]
    LoopDuringVoice,
    /// Loop while the note is held, then play on past the loop end.
    LoopWhileGated,
    /// Loop a fixed number of times.
    LoopForCount,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopDirection {
    #[default]
    ForwardOnly,
    AlternateDirections,
}

/// Playback settings for one sample slot. Negative frame positions mean
/// "use the sample's own extent".
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociatedSample {
    pub active: bool,
    pub sample_id: Option<SampleId>,
    pub start_sample: i64,
    pub end_sample: i64,
    pub start_loop: i64,
    pub end_loop: i64,
    pub play_mode: PlayMode,
    pub loop_active: bool,
    pub play_reverse: bool,
    pub loop_mode: LoopMode,
    pub loop_direction: LoopDirection,
    pub loop_count_when_counted: i32,
}

impl Default for AssociatedSample {
    fn default() -> Self {
        Self {
            active: false,
            sample_id: None,
            start_sample: -1,
            end_sample: -1,
            start_loop: -1,
            end_loop: -1,
            play_mode: PlayMode::Normal,
            loop_active: false,
            play_reverse: false,
            loop_mode: LoopMode::LoopDuringVoice,
            loop_direction: LoopDirection::ForwardOnly,
            loop_count_when_counted: 0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneMapping {
    pub root_key: i16,
    pub keyboard_range: KeyboardRange,
    pub velocity_range: VelocityRange,
    /// Pitch bend range in semitones, down and up.
    pub pb_down: i16,
    pub pb_up: i16,
    /// How far velocity scales the sample amplitude, 0..1. At 0 (the
    /// default) velocity only reaches the voice through the mod matrix.
    pub velocity_sens: f32,
    /// Linear sample amplitude.
    pub amplitude: f32,
    /// -1..1
    pub pan: f32,
    /// Semitones.
    pub pitch_offset: f32,
}

impl Default for ZoneMapping {
    fn default() -> Self {
        Self {
            root_key: 60,
            keyboard_range: KeyboardRange::default(),
            velocity_range: VelocityRange::default(),
            pb_down: 2,
            pb_up: 2,
            velocity_sens: 0.0,
            amplitude: 1.0,
            pan: 0.0,
            pitch_offset: 0.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneOutputInfo {
    pub amplitude: f32,
    pub pan: f32,
    pub muted: bool,
    pub route_to: BusAddress,
}

impl Default for ZoneOutputInfo {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            pan: 0.0,
            muted: false,
            route_to: BusAddress::Default,
        }
    }
}

pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub sample_data: [AssociatedSample; MAX_SAMPLES_PER_ZONE],
    pub sample_pointers: [Option<Arc<Sample>>; MAX_SAMPLES_PER_ZONE],
    /// When true, loading a sample replaces root key, ranges and loop points.
    pub sample_load_overrides_mapping: bool,
    pub mapping: ZoneMapping,
    pub output_info: ZoneOutputInfo,
    pub processor_storage: [ProcessorStorage; PROCESSORS_PER_ZONE],
    pub routing_table: VoiceRoutingTable,
    pub lfo_storage: [StepLfoStorage; LFOS_PER_ZONE],
    pub aeg_storage: AdsrStorage,
    pub eg2_storage: AdsrStorage,
    pub output: StereoBlock,
    voice_handles: [Option<VoiceId>; MAX_VOICES],
    active_voices: u32,
    gated_voice_count: u32,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ZoneId(next_id()),
            name: name.into(),
            sample_data: [AssociatedSample::default(); MAX_SAMPLES_PER_ZONE],
            sample_pointers: std::array::from_fn(|_| None),
            sample_load_overrides_mapping: true,
            mapping: ZoneMapping::default(),
            output_info: ZoneOutputInfo::default(),
            processor_storage: [ProcessorStorage::default(); PROCESSORS_PER_ZONE],
            routing_table: VoiceRoutingTable::default(),
            lfo_storage: [StepLfoStorage::default(); LFOS_PER_ZONE],
            aeg_storage: AdsrStorage::default(),
            eg2_storage: AdsrStorage::default(),
            output: [[0.0; BLOCK_SIZE]; 2],
            voice_handles: [None; MAX_VOICES],
            active_voices: 0,
            gated_voice_count: 0,
        }
    }

    /// A zone whose first slot refers to `sample_id`. Call [`Zone::attach_to_sample`]
    /// to resolve it.
    pub fn with_sample(sample_id: SampleId) -> Self {
        let mut zone = Self::new(format!("zone {}", sample_id.0));
        zone.sample_data[0].sample_id = Some(sample_id);
        zone.sample_data[0].active = true;
        zone
    }

    /// Resolve sample slot `index` through the manager. When
    /// `sample_load_overrides_mapping` is set, the sample's metadata replaces
    /// the zone's root key, ranges and loop points.
    pub fn attach_to_sample(&mut self, manager: &SampleManager, index: usize) -> bool {
        let Some(slot) = self.sample_data.get_mut(index) else {
            return false;
        };
        let Some(sample) = slot.sample_id.and_then(|id| manager.get_sample(id)) else {
            warn!(zone = %self.name, index, "sample slot has no loaded sample");
            self.sample_pointers[index] = None;
            return false;
        };

        if self.sample_load_overrides_mapping {
            let meta = &sample.meta;
            if let Some(root) = meta.root_key {
                self.mapping.root_key = root;
            }
            if let Some(keys) = meta.key_range {
                self.mapping.keyboard_range = keys;
            }
            if let Some(vel) = meta.velocity_range {
                self.mapping.velocity_range = vel;
            }
            slot.start_sample = 0;
            slot.end_sample = sample.sample_length() as i64;
            match meta.loop_points {
                Some((start, end)) if end > start => {
                    slot.loop_active = true;
                    slot.start_loop = start.max(0);
                    slot.end_loop = end.min(slot.end_sample);
                }
                _ => {
                    slot.start_loop = 0;
                    slot.end_loop = slot.end_sample;
                }
            }
        }
        if index == 0 {
            self.name = sample.display_name.clone();
        }
        debug!(zone = %self.name, sample = sample.id.0, "attached sample");
        self.sample_pointers[index] = Some(sample);
        true
    }

    pub fn is_active(&self) -> bool {
        self.active_voices != 0
    }

    pub fn active_voice_count(&self) -> u32 {
        self.active_voices
    }

    pub fn gated_voice_count(&self) -> u32 {
        self.gated_voice_count
    }

    /// Register a voice. Returns true when the zone just became active.
    pub(crate) fn add_voice(&mut self, id: VoiceId) -> bool {
        if self.voice_handles.iter().flatten().any(|&v| v == id) {
            return false;
        }
        let Some(slot) = self.voice_handles.iter_mut().find(|s| s.is_none()) else {
            trace!(zone = %self.name, "zone voice table full");
            return false;
        };
        *slot = Some(id);
        self.active_voices += 1;
        self.active_voices == 1
    }

    /// Unregister a voice. Returns true when the zone just became inactive.
    pub(crate) fn remove_voice(&mut self, id: VoiceId) -> bool {
        match self.voice_handles.iter_mut().find(|s| **s == Some(id)) {
            Some(slot) => {
                *slot = None;
                self.active_voices = self.active_voices.saturating_sub(1);
                self.active_voices == 0
            }
            None => false,
        }
    }

    /// Render every voice of this zone into its output (or its routed bus),
    /// then retire voices that finished this block.
    pub(crate) fn process(
        &mut self,
        voices: &mut [Option<Voice>],
        pool: &mut MemoryPool,
        vctx: &VoiceContext<'_>,
        busses: &mut Busses,
        part_bus: BusAddress,
    ) {
        let mut mixed: StereoBlock = [[0.0; BLOCK_SIZE]; 2];
        let mut finished = [None; MAX_VOICES];
        let mut finished_count = 0;
        let mut gated = 0;

        for id in self.voice_handles.iter().flatten() {
            let Some(voice) = voices.get_mut(id.0).and_then(Option::as_mut) else {
                continue;
            };
            if !voice.is_voice_assigned {
                continue;
            }
            voice.process(self, vctx);
            if voice.is_gated {
                gated += 1;
            }
            accumulate_stereo(&voice.output, &mut mixed);
            if !voice.is_voice_playing {
                finished[finished_count] = Some(*id);
                finished_count += 1;
            }
        }
        self.gated_voice_count = gated;

        clear_stereo(&mut self.output);
        if !self.output_info.muted {
            match self.output_info.route_to {
                BusAddress::Default => self.output = mixed,
                route => accumulate_stereo(&mixed, &mut busses.route_mut(route, part_bus).output),
            }
        }

        for id in finished.iter().take(finished_count).flatten() {
            if let Some(voice) = voices.get_mut(id.0).and_then(Option::as_mut) {
                voice.cleanup(pool);
            }
            self.remove_voice(*id);
        }
    }
}
