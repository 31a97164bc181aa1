//! Output busses: one per part, a few aux busses, and main.

/*
Bus Routing
===========

    zone ─┐
    zone ─┼─→ group ─┐            (default route)
    zone ─┘          ├─→ part bus ─┬─ effects, level, pan ─┬─→ main
          group ─────┘             │                       │
                                   └─ aux sends ──→ aux bus┘
                                                            main ── effects, level ──→ out

A zone or group may also route straight to any bus by address, skipping the
default path.

Busses are cleared at the top of every block. After all parts have rendered,
`mix_down` runs the part busses, feeds the aux busses from the sends, runs
the aux busses and finally the main bus.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::lipol::BlockInterpolator;
use crate::dsp::mix::{accumulate_scaled, accumulate_stereo, clear_stereo, peak, StereoBlock};
use crate::dsp::pan::pan_stereo_block;
use crate::dsp::tables::Tables;
use crate::engine::memory_pool::MemoryPool;
use crate::processor::{Processor, ProcessorContext, ProcessorStorage};
use crate::{BLOCK_SIZE, NUM_AUX, NUM_PARTS};

pub const MAX_BUS_EFFECTS: usize = 4;
pub const BUS_COUNT: usize = 1 + NUM_PARTS + NUM_AUX;
const VU_FALLOFF: f32 = 0.9;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusAddress {
    /// Follow the owner's default route (group → part bus).
    #[default]
    Default,
    Main,
    Part(usize),
    Aux(usize),
}

impl BusAddress {
    /// Stable index into per-bus tables, main first. `None` for `Default` or out of range.
    pub fn index(self) -> Option<usize> {
        match self {
            BusAddress::Default => None,
            BusAddress::Main => Some(0),
            BusAddress::Part(p) if p < NUM_PARTS => Some(1 + p),
            BusAddress::Aux(a) if a < NUM_AUX => Some(1 + NUM_PARTS + a),
            _ => None,
        }
    }
}

pub struct BusEffect {
    pub storage: ProcessorStorage,
    processor: Option<Processor>,
    mix: BlockInterpolator,
    scratch: StereoBlock,
}

impl BusEffect {
    fn new() -> Self {
        Self {
            storage: ProcessorStorage::default(),
            processor: None,
            mix: BlockInterpolator::new(),
            scratch: [[0.0; BLOCK_SIZE]; 2],
        }
    }

    fn process(&mut self, ctx_base: &BusContext<'_>, io: &mut StereoBlock) {
        let Some(processor) = self.processor.as_mut() else {
            return;
        };
        let ctx = ProcessorContext {
            sample_rate: ctx_base.sample_rate,
            sample_rate_inv: 1.0 / ctx_base.sample_rate,
            tables: ctx_base.tables,
            float_params: &self.storage.float_params,
            int_params: &self.storage.int_params,
        };
        let [wet_l, wet_r] = &mut self.scratch;
        processor.process_stereo(&ctx, &io[0], &io[1], wet_l, wet_r, 0.0);
        self.mix.set_target(self.storage.mix.clamp(0.0, 1.0));
        let dry = *io;
        self.mix.fade_blocks(&dry[0], wet_l, &mut io[0]);
        self.mix.fade_blocks(&dry[1], wet_r, &mut io[1]);
    }
}

pub(crate) struct BusContext<'a> {
    pub sample_rate: f32,
    pub tables: &'a Tables,
}

pub struct Bus {
    pub address: BusAddress,
    pub output: StereoBlock,
    pub vu_level: [f32; 2],
    pub level: f32,
    pub pan: f32,
    pub mute: bool,
    pub aux_sends: [f32; NUM_AUX],
    effects: [BusEffect; MAX_BUS_EFFECTS],
    level_interp: BlockInterpolator,
}

impl Bus {
    pub fn new(address: BusAddress) -> Self {
        let mut level_interp = BlockInterpolator::new();
        level_interp.set_target_instant(1.0);
        Self {
            address,
            output: [[0.0; BLOCK_SIZE]; 2],
            vu_level: [0.0; 2],
            level: 1.0,
            pan: 0.0,
            mute: false,
            aux_sends: [0.0; NUM_AUX],
            effects: std::array::from_fn(|_| BusEffect::new()),
            level_interp,
        }
    }

    pub fn clear(&mut self) {
        clear_stereo(&mut self.output);
    }

    pub fn effect_storage(&self, slot: usize) -> Option<&ProcessorStorage> {
        self.effects.get(slot).map(|e| &e.storage)
    }

    /// Swap the processor in an effect slot. Pool memory held by the old
    /// processor is returned first.
    pub fn set_effect(
        &mut self,
        slot: usize,
        storage: ProcessorStorage,
        pool: &mut MemoryPool,
        sample_rate: f32,
    ) -> bool {
        let Some(effect) = self.effects.get_mut(slot) else {
            return false;
        };
        if let Some(mut old) = effect.processor.take() {
            old.release_memory(pool);
        }
        effect.processor = Processor::spawn(&storage, pool, sample_rate);
        effect.storage = storage;
        effect.mix.set_target_instant(storage.mix.clamp(0.0, 1.0));
        true
    }

    /// Update a running effect's parameters without respawning it. Fails when
    /// the slot holds a different processor type or nothing is running.
    pub fn update_effect_params(&mut self, slot: usize, storage: ProcessorStorage) -> bool {
        match self.effects.get_mut(slot) {
            Some(effect)
                if effect.processor.is_some()
                    && effect.storage.processor_type == storage.processor_type =>
            {
                effect.storage = storage;
                effect.mix.set_target(storage.mix.clamp(0.0, 1.0));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn release_effects(&mut self, pool: &mut MemoryPool) {
        for effect in self.effects.iter_mut() {
            if let Some(mut p) = effect.processor.take() {
                p.release_memory(pool);
            }
        }
    }

    fn process(&mut self, ctx: &BusContext<'_>) {
        for effect in self.effects.iter_mut() {
            effect.process(ctx, &mut self.output);
        }
        let level = if self.mute { 0.0 } else { self.level.max(0.0) };
        self.level_interp.set_target(level);
        let [l, r] = &mut self.output;
        self.level_interp.multiply_2_blocks(l, r);
        if self.pan != 0.0 {
            pan_stereo_block(self.pan, l, r);
        }
        for (c, vu) in self.vu_level.iter_mut().enumerate() {
            let p = peak(&self.output[c]);
            *vu = if p.is_finite() { p.max(*vu * VU_FALLOFF) } else { 0.0 };
        }
    }
}

pub struct Busses {
    pub main_bus: Bus,
    pub part_busses: [Bus; NUM_PARTS],
    pub aux_busses: [Bus; NUM_AUX],
}

impl Default for Busses {
    fn default() -> Self {
        Self::new()
    }
}

impl Busses {
    pub fn new() -> Self {
        Self {
            main_bus: Bus::new(BusAddress::Main),
            part_busses: std::array::from_fn(|i| Bus::new(BusAddress::Part(i))),
            aux_busses: std::array::from_fn(|i| Bus::new(BusAddress::Aux(i))),
        }
    }

    pub fn clear(&mut self) {
        self.main_bus.clear();
        for bus in self.part_busses.iter_mut().chain(self.aux_busses.iter_mut()) {
            bus.clear();
        }
    }

    pub fn bus(&self, address: BusAddress) -> Option<&Bus> {
        match address {
            BusAddress::Main => Some(&self.main_bus),
            BusAddress::Part(p) => self.part_busses.get(p),
            BusAddress::Aux(a) => self.aux_busses.get(a),
            BusAddress::Default => None,
        }
    }

    pub fn bus_mut(&mut self, address: BusAddress) -> Option<&mut Bus> {
        match address {
            BusAddress::Main => Some(&mut self.main_bus),
            BusAddress::Part(p) => self.part_busses.get_mut(p),
            BusAddress::Aux(a) => self.aux_busses.get_mut(a),
            BusAddress::Default => None,
        }
    }

    /// Bus for a route, falling back to `fallback` when the route is `Default` or invalid.
    pub fn route_mut(&mut self, route: BusAddress, fallback: BusAddress) -> &mut Bus {
        let address = if route.index().is_some() { route } else { fallback };
        match address {
            BusAddress::Part(p) if p < NUM_PARTS => &mut self.part_busses[p],
            BusAddress::Aux(a) if a < NUM_AUX => &mut self.aux_busses[a],
            _ => &mut self.main_bus,
        }
    }

    pub(crate) fn mix_down(&mut self, ctx: &BusContext<'_>) {
        for part in self.part_busses.iter_mut() {
            part.process(ctx);
            for (aux, &send) in self.aux_busses.iter_mut().zip(part.aux_sends.iter()) {
                if send > 0.0 {
                    accumulate_scaled(&part.output[0], send, &mut aux.output[0]);
                    accumulate_scaled(&part.output[1], send, &mut aux.output[1]);
                }
            }
            accumulate_stereo(&part.output, &mut self.main_bus.output);
        }
        for aux in self.aux_busses.iter_mut() {
            aux.process(ctx);
            accumulate_stereo(&aux.output, &mut self.main_bus.output);
        }
        self.main_bus.process(ctx);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bus> {
        std::iter::once(&self.main_bus)
            .chain(self.part_busses.iter())
            .chain(self.aux_busses.iter())
    }

    pub(crate) fn release_effects(&mut self, pool: &mut MemoryPool) {
        self.main_bus.release_effects(pool);
        for bus in self.part_busses.iter_mut().chain(self.aux_busses.iter_mut()) {
            bus.release_effects(pool);
        }
    }
}
