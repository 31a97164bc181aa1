//! A part: the groups answering one MIDI channel, plus that channel's
//! smoothed controllers.

use tracing::trace;

use crate::dsp::mix::accumulate_stereo;
use crate::dsp::smoother::BlockSmoother;
use crate::engine::bus::{BusAddress, Busses};
use crate::engine::group::{Group, GroupId};
use crate::engine::memory_pool::MemoryPool;
use crate::engine::next_id;
use crate::voice::{Voice, VoiceContext};

/// Groups a part can hold before adding one reallocates.
pub const GROUP_CAPACITY: usize = 32;
pub const MOD_WHEEL_CC: usize = 1;

/// Channel value that makes a part answer every channel.
pub const OMNI_CHANNEL: i16 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub u64);

/// Smoothed per-channel controllers.
#[derive(Debug, Clone)]
pub struct PartControllers {
    /// -1..1
    pub pitch_bend: BlockSmoother,
    /// 0..1 per controller number.
    pub midi_cc: [BlockSmoother; 128],
}

impl Default for PartControllers {
    fn default() -> Self {
        Self {
            pitch_bend: BlockSmoother::default(),
            midi_cc: [BlockSmoother::default(); 128],
        }
    }
}

impl PartControllers {
    pub fn process(&mut self) {
        self.pitch_bend.process();
        for cc in &mut self.midi_cc {
            cc.process();
        }
    }

    pub fn mod_wheel(&self) -> f32 {
        self.midi_cc[MOD_WHEEL_CC].output
    }
}

pub struct Part {
    pub id: PartId,
    pub index: usize,
    pub channel: i16,
    pub controllers: PartControllers,
    groups: Vec<Box<Group>>,
}

impl Part {
    pub fn new(index: usize) -> Self {
        Self {
            id: PartId(next_id()),
            index,
            channel: index as i16,
            controllers: PartControllers::default(),
            groups: Vec::with_capacity(GROUP_CAPACITY),
        }
    }

    /// True when the part answers events on `channel`.
    pub fn responds_to(&self, channel: i16) -> bool {
        self.channel == OMNI_CHANNEL || channel < 0 || self.channel == channel
    }

    pub fn bus_address(&self) -> BusAddress {
        BusAddress::Part(self.index)
    }

    pub fn groups(&self) -> &[Box<Group>] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index).map(|g| &**g)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index).map(|g| &mut **g)
    }

    pub fn group_index(&self, id: GroupId) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    pub fn add_group(&mut self, group: Box<Group>) -> usize {
        if self.groups.len() == self.groups.capacity() {
            trace!(part = self.index, "group list full, growing on the audio thread");
        }
        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Detach a group. The caller must have stopped its voices first.
    pub fn remove_group(&mut self, index: usize) -> Option<Box<Group>> {
        (index < self.groups.len()).then(|| self.groups.remove(index))
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for group in &mut self.groups {
            group.set_sample_rate(sample_rate);
        }
    }

    pub(crate) fn process(
        &mut self,
        voices: &mut [Option<Voice>],
        pool: &mut MemoryPool,
        vctx: &VoiceContext<'_>,
        busses: &mut Busses,
    ) {
        let part_bus = self.bus_address();
        for group in self.groups.iter_mut().filter(|g| g.is_active()) {
            group.process(voices, pool, vctx, busses, part_bus);
            accumulate_stereo(&group.output, &mut busses.route_mut(part_bus, part_bus).output);
        }
    }
}
