//! A group: a list of zones plus one monophonic set of envelopes and LFOs
//! shared by all of them.

use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::dsp::amplify::amp_to_gain;
use crate::dsp::envelope::{AdsrStorage, Envelope};
use crate::dsp::lipol::BlockInterpolator;
use crate::dsp::mix::{accumulate_stereo, clear_stereo, StereoBlock};
use crate::dsp::pan::pan_stereo_block;
use crate::engine::bus::{BusAddress, Busses};
use crate::engine::memory_pool::MemoryPool;
use crate::engine::next_id;
use crate::engine::zone::{Zone, ZoneId};
use crate::modulation::group_matrix::{
    GroupModMatrix, GroupModSource, GroupModTarget, GroupRoutingTable,
};
use crate::modulation::step_lfo::{StepLfo, StepLfoStorage};
use crate::voice::{Voice, VoiceContext};
use crate::{BLOCK_SIZE, EGS_PER_GROUP, LFOS_PER_GROUP};

/// Zones a group can hold before adding one reallocates.
pub const ZONE_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupOutputInfo {
    pub amplitude: f32,
    pub pan: f32,
    pub muted: bool,
    pub route_to: BusAddress,
}

impl Default for GroupOutputInfo {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            pan: 0.0,
            muted: false,
            route_to: BusAddress::Default,
        }
    }
}

pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub output_info: GroupOutputInfo,
    pub output: StereoBlock,

    pub geg_storage: [AdsrStorage; EGS_PER_GROUP],
    pub lfo_storage: [StepLfoStorage; LFOS_PER_GROUP],
    pub routing_table: GroupRoutingTable,

    gegs: [Envelope; EGS_PER_GROUP],
    lfos: [StepLfo; LFOS_PER_GROUP],
    mod_matrix: GroupModMatrix,
    output_amp: BlockInterpolator,
    gated: bool,

    zones: Vec<Box<Zone>>,
    active_zones: u32,
    sample_rate: f32,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        let sample_rate = 48_000.0;
        let mut output_amp = BlockInterpolator::new();
        output_amp.set_target_instant(1.0);
        Self {
            id: GroupId(next_id()),
            name: name.into(),
            output_info: GroupOutputInfo::default(),
            output: [[0.0; BLOCK_SIZE]; 2],
            geg_storage: [AdsrStorage::default(); EGS_PER_GROUP],
            lfo_storage: [StepLfoStorage::default(); LFOS_PER_GROUP],
            routing_table: GroupRoutingTable::default(),
            gegs: std::array::from_fn(|_| Envelope::new(sample_rate)),
            lfos: std::array::from_fn(|_| StepLfo::new(sample_rate)),
            mod_matrix: GroupModMatrix::default(),
            output_amp,
            gated: false,
            zones: Vec::with_capacity(ZONE_CAPACITY),
            active_zones: 0,
            sample_rate,
        }
    }

    pub fn zones(&self) -> &[Box<Zone>] {
        &self.zones
    }

    pub fn zone(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index).map(|z| &**z)
    }

    pub fn zone_mut(&mut self, index: usize) -> Option<&mut Zone> {
        self.zones.get_mut(index).map(|z| &mut **z)
    }

    pub fn zone_index(&self, id: ZoneId) -> Option<usize> {
        self.zones.iter().position(|z| z.id == id)
    }

    /// Append a zone and return its index.
    pub fn add_zone(&mut self, zone: Box<Zone>) -> usize {
        if self.zones.len() == self.zones.capacity() {
            trace!(group = %self.name, "zone list full, growing on the audio thread");
        }
        self.zones.push(zone);
        self.zones.len() - 1
    }

    /// Detach a zone. The caller must have stopped its voices first.
    pub fn remove_zone(&mut self, index: usize) -> Option<Box<Zone>> {
        if index >= self.zones.len() {
            return None;
        }
        let zone = self.zones.remove(index);
        if zone.is_active() {
            self.remove_active_zone();
        }
        Some(zone)
    }

    pub fn is_active(&self) -> bool {
        self.active_zones != 0
    }

    pub fn active_zone_count(&self) -> u32 {
        self.active_zones
    }

    pub fn is_gated(&self) -> bool {
        self.gated
    }

    /// A zone went from silent to playing. The first one restarts the
    /// group's envelopes and LFOs.
    pub(crate) fn add_active_zone(&mut self, rng: &mut StdRng, engine_seconds: f64) {
        if self.active_zones == 0 {
            for env in &mut self.gegs {
                env.attack_from(0.0);
            }
            let rates = self.lfo_rates();
            self.mod_matrix
                .set_base(self.output_info.amplitude, self.output_info.pan, rates);
            self.mod_matrix.process(&self.routing_table);
            for (i, lfo) in self.lfos.iter_mut().enumerate() {
                let rate = self.mod_matrix.value(GroupModTarget::LfoRate(i));
                lfo.assign(&self.lfo_storage[i], rate, rng, engine_seconds);
            }
            self.output_amp
                .set_target_instant(amp_to_gain(self.mod_matrix.value(GroupModTarget::OutputAmplitude)));
            self.gated = true;
            debug!(group = %self.name, "group active");
        }
        self.active_zones += 1;
    }

    pub(crate) fn remove_active_zone(&mut self) {
        self.active_zones = self.active_zones.saturating_sub(1);
        if self.active_zones == 0 {
            self.gated = false;
        }
    }

    fn lfo_rates(&self) -> [f32; LFOS_PER_GROUP] {
        std::array::from_fn(|i| self.lfo_storage[i].rate)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        for env in &mut self.gegs {
            env.set_sample_rate(self.sample_rate);
        }
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(self.sample_rate);
        }
    }

    /// Output of one group envelope, for display.
    pub fn geg_level(&self, index: usize) -> f32 {
        self.gegs.get(index).map_or(0.0, |e| e.output)
    }

    pub(crate) fn process(
        &mut self,
        voices: &mut [Option<Voice>],
        pool: &mut MemoryPool,
        vctx: &VoiceContext<'_>,
        busses: &mut Busses,
        part_bus: BusAddress,
    ) {
        clear_stereo(&mut self.output);
        if !self.is_active() {
            return;
        }

        let mut gated = false;
        let mut mixed: StereoBlock = [[0.0; BLOCK_SIZE]; 2];
        let mut went_silent = 0;
        for zone in self.zones.iter_mut().filter(|z| z.is_active()) {
            zone.process(voices, pool, vctx, busses, part_bus);
            if !zone.is_active() {
                went_silent += 1;
            }
            gated |= zone.gated_voice_count() > 0;
            accumulate_stereo(&zone.output, &mut mixed);
        }
        for _ in 0..went_silent {
            self.remove_active_zone();
        }
        self.gated = gated;

        self.process_modulators();

        let amp = amp_to_gain(self.mod_matrix.value(GroupModTarget::OutputAmplitude));
        self.output_amp.set_target(amp);
        {
            let [l, r] = &mut mixed;
            self.output_amp.multiply_2_blocks(l, r);
            let pan = self.mod_matrix.value(GroupModTarget::OutputPan);
            if pan != 0.0 {
                pan_stereo_block(pan, l, r);
            }
        }

        if self.output_info.muted {
            return;
        }
        match self.output_info.route_to {
            BusAddress::Default => self.output = mixed,
            route => accumulate_stereo(&mixed, &mut busses.route_mut(route, part_bus).output),
        }
    }

    fn process_modulators(&mut self) {
        for (i, env) in self.gegs.iter_mut().enumerate() {
            env.process_block(&self.geg_storage[i], self.gated);
        }
        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            let rate = self.mod_matrix.value(GroupModTarget::LfoRate(i));
            lfo.process(&self.lfo_storage[i], rate, BLOCK_SIZE, self.gated);
        }

        let rates = self.lfo_rates();
        let m = &mut self.mod_matrix;
        m.set_source(GroupModSource::Eg1, self.gegs[0].output);
        m.set_source(GroupModSource::Eg2, self.gegs[1].output);
        for (i, lfo) in self.lfos.iter().enumerate() {
            m.set_source(GroupModSource::lfo(i), lfo.output);
        }
        m.set_base(self.output_info.amplitude, self.output_info.pan, rates);
        m.process(&self.routing_table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::group_matrix::GroupModRoute;
    use rand::SeedableRng;

    #[test]
    fn test_add_and_remove_zone() {
        let mut group = Group::new("g");
        let a = group.add_zone(Box::new(Zone::new("a")));
        let b = group.add_zone(Box::new(Zone::new("b")));
        assert_eq!((a, b), (0, 1));
        let id = group.zones()[1].id;
        assert_eq!(group.zone_index(id), Some(1));
        let removed = group.remove_zone(0).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(group.zone_index(id), Some(0));
        assert!(group.remove_zone(5).is_none());
    }

    #[test]
    fn test_active_zone_counting_gates_group() {
        let mut group = Group::new("g");
        let mut rng = StdRng::seed_from_u64(3);
        assert!(!group.is_active());
        group.add_active_zone(&mut rng, 0.0);
        group.add_active_zone(&mut rng, 0.0);
        assert!(group.is_gated());
        group.remove_active_zone();
        assert!(group.is_active());
        group.remove_active_zone();
        assert!(!group.is_active());
        assert!(!group.is_gated());
        group.remove_active_zone();
        assert_eq!(group.active_zone_count(), 0);
    }

    #[test]
    fn test_envelope_modulates_group_pan() {
        let mut group = Group::new("g");
        group.routing_table[0] =
            GroupModRoute::new(GroupModSource::Eg1, GroupModTarget::OutputPan, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        group.add_active_zone(&mut rng, 0.0);
        for _ in 0..200 {
            group.process_modulators();
        }
        assert!((group.geg_level(0) - 1.0).abs() < 1e-6);
        assert!((group.mod_matrix.value(GroupModTarget::OutputPan) - 1.0).abs() < 1e-6);
    }
}
