//! State the audio thread publishes for the UI to poll.
//!
//! Everything is a relaxed atomic: readers get a recent value, never a torn
//! one, and the audio thread never waits.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

use crate::engine::bus::BUS_COUNT;
use crate::MAX_VOICES;

#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct VoiceDisplaySlot {
    active: AtomicBool,
    gated: AtomicBool,
    part: AtomicI32,
    group: AtomicI32,
    zone: AtomicI32,
    midi_note: AtomicI32,
    midi_channel: AtomicI32,
    sample_pos: AtomicI32,
}

/// Plain copy of one voice's display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoiceDisplayItem {
    pub active: bool,
    pub gated: bool,
    pub part: i32,
    pub group: i32,
    pub zone: i32,
    pub midi_note: i32,
    pub midi_channel: i32,
    pub sample_pos: i32,
}

#[derive(Debug)]
pub struct SharedUiState {
    vu_levels: [[AtomicF32; 2]; BUS_COUNT],
    voices: [VoiceDisplaySlot; MAX_VOICES],
    voice_count: AtomicU32,
    dropped_notes: AtomicU32,
    display_generation: AtomicU64,
}

impl Default for SharedUiState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedUiState {
    pub fn new() -> Self {
        Self {
            vu_levels: std::array::from_fn(|_| [AtomicF32::default(), AtomicF32::default()]),
            voices: std::array::from_fn(|_| VoiceDisplaySlot::default()),
            voice_count: AtomicU32::new(0),
            dropped_notes: AtomicU32::new(0),
            display_generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_vu_level(&self, bus_index: usize, level: [f32; 2]) {
        if let Some(slot) = self.vu_levels.get(bus_index) {
            slot[0].store(level[0]);
            slot[1].store(level[1]);
        }
    }

    /// Peak level of a bus, indexed as `BusAddress::index`.
    pub fn vu_level(&self, bus_index: usize) -> [f32; 2] {
        self.vu_levels
            .get(bus_index)
            .map_or([0.0; 2], |s| [s[0].load(), s[1].load()])
    }

    pub(crate) fn set_voice(&self, index: usize, item: VoiceDisplayItem) {
        let Some(slot) = self.voices.get(index) else {
            return;
        };
        slot.active.store(item.active, Ordering::Relaxed);
        slot.gated.store(item.gated, Ordering::Relaxed);
        slot.part.store(item.part, Ordering::Relaxed);
        slot.group.store(item.group, Ordering::Relaxed);
        slot.zone.store(item.zone, Ordering::Relaxed);
        slot.midi_note.store(item.midi_note, Ordering::Relaxed);
        slot.midi_channel.store(item.midi_channel, Ordering::Relaxed);
        slot.sample_pos.store(item.sample_pos, Ordering::Relaxed);
    }

    pub fn voice(&self, index: usize) -> VoiceDisplayItem {
        self.voices.get(index).map_or_else(VoiceDisplayItem::default, |slot| VoiceDisplayItem {
            active: slot.active.load(Ordering::Relaxed),
            gated: slot.gated.load(Ordering::Relaxed),
            part: slot.part.load(Ordering::Relaxed),
            group: slot.group.load(Ordering::Relaxed),
            zone: slot.zone.load(Ordering::Relaxed),
            midi_note: slot.midi_note.load(Ordering::Relaxed),
            midi_channel: slot.midi_channel.load(Ordering::Relaxed),
            sample_pos: slot.sample_pos.load(Ordering::Relaxed),
        })
    }

    pub fn active_voices(&self) -> impl Iterator<Item = VoiceDisplayItem> + '_ {
        (0..MAX_VOICES).map(|i| self.voice(i)).filter(|v| v.active)
    }

    pub(crate) fn set_voice_count(&self, count: u32) {
        self.voice_count.store(count, Ordering::Relaxed);
    }

    pub fn voice_count(&self) -> u32 {
        self.voice_count.load(Ordering::Relaxed)
    }

    pub(crate) fn count_dropped_note(&self) {
        self.dropped_notes.fetch_add(1, Ordering::Relaxed);
    }

    /// Notes that found no free voice since the engine started.
    pub fn dropped_note_count(&self) -> u32 {
        self.dropped_notes.load(Ordering::Relaxed)
    }

    pub(crate) fn bump_display_generation(&self) {
        self.display_generation.fetch_add(1, Ordering::Release);
    }

    /// Increments every time the voice display is rewritten.
    pub fn display_generation(&self) -> u64 {
        self.display_generation.load(Ordering::Acquire)
    }
}
