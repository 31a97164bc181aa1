//! Group-level modulation: group envelopes and LFOs onto group output.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{LFOS_PER_GROUP, MOD_MATRIX_SLOTS};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupModSource {
    #[default]
    None,
    Eg1,
    Eg2,
    Lfo1,
    Lfo2,
    Lfo3,
}

const NUM_GROUP_SOURCES: usize = 6;

impl GroupModSource {
    pub fn lfo(index: usize) -> Self {
        match index {
            0 => GroupModSource::Lfo1,
            1 => GroupModSource::Lfo2,
            _ => GroupModSource::Lfo3,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupModTarget {
    OutputAmplitude,
    OutputPan,
    LfoRate(usize),
}

const NUM_GROUP_SLOTS: usize = 2 + LFOS_PER_GROUP;

impl GroupModTarget {
    fn slot(self) -> Option<usize> {
        match self {
            GroupModTarget::OutputAmplitude => Some(0),
            GroupModTarget::OutputPan => Some(1),
            GroupModTarget::LfoRate(i) if i < LFOS_PER_GROUP => Some(2 + i),
            GroupModTarget::LfoRate(_) => None,
        }
    }
}

const GROUP_LO: [f32; NUM_GROUP_SLOTS] = [0.0, -1.0, -10.0, -10.0, -10.0];
const GROUP_HI: [f32; NUM_GROUP_SLOTS] = [2.0, 1.0, 10.0, 10.0, 10.0];

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupModRoute {
    pub active: bool,
    pub source: GroupModSource,
    pub target: Option<GroupModTarget>,
    pub depth: f32,
}

impl GroupModRoute {
    pub fn new(source: GroupModSource, target: GroupModTarget, depth: f32) -> Self {
        Self {
            active: true,
            source,
            target: Some(target),
            depth,
        }
    }
}

pub type GroupRoutingTable = [GroupModRoute; MOD_MATRIX_SLOTS];

#[derive(Debug, Clone, Default)]
pub struct GroupModMatrix {
    sources: [f32; NUM_GROUP_SOURCES],
    base: [f32; NUM_GROUP_SLOTS],
    values: [f32; NUM_GROUP_SLOTS],
}

impl GroupModMatrix {
    pub fn set_base(&mut self, amplitude: f32, pan: f32, lfo_rates: [f32; LFOS_PER_GROUP]) {
        self.base[0] = amplitude;
        self.base[1] = pan;
        self.base[2..].copy_from_slice(&lfo_rates);
    }

    pub fn set_source(&mut self, source: GroupModSource, value: f32) {
        self.sources[source as usize] = if value.is_finite() { value } else { 0.0 };
    }

    pub fn process(&mut self, routes: &GroupRoutingTable) {
        self.values = self.base;
        for route in routes.iter().filter(|r| r.active) {
            if route.source == GroupModSource::None || !route.depth.is_finite() {
                continue;
            }
            if let Some(slot) = route.target.and_then(|t| t.slot()) {
                self.values[slot] += self.sources[route.source as usize] * route.depth;
            }
        }
        for i in 0..NUM_GROUP_SLOTS {
            let v = if self.values[i].is_finite() {
                self.values[i]
            } else {
                self.base[i]
            };
            self.values[i] = if v.is_finite() {
                v.clamp(GROUP_LO[i], GROUP_HI[i])
            } else {
                0.0
            };
        }
    }

    pub fn value(&self, target: GroupModTarget) -> f32 {
        target.slot().map_or(0.0, |s| self.values[s])
    }
}
