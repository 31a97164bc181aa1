#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::zone::Zone;
use crate::processor::MAX_PROCESSOR_FLOAT_PARAMS;
use crate::{LFOS_PER_ZONE, MOD_MATRIX_SLOTS, PROCESSORS_PER_ZONE};

/*
Voice Modulation Matrix
=======================

Every block a voice rebuilds its parameter values from scratch:

    values = base (the zone's stored settings)
    for each active route:
        values[target] += sources[source] * depth
    clamp every value to its target's range

Targets are addressed by a flat slot index:

    slot range        target
    ---------------   --------------------------------------------
    [ 0, 16)          envelope A H D S R and shapes, for AEG / EG2
    [16, 19)          step LFO rate
    [19, 25)          sample pitch, playback ratio, sample pan,
                      sample amplitude, output pan, output amplitude
    [25, 29)          processor mix
    [29, 65)          processor float parameters, 9 per processor

A route whose target no longer exists resolves to no slot and is skipped.
A non-finite result falls back to the base value.
*/

pub const ENV_PARAMS: usize = 8;
const ENV_BASE: usize = 0;
const LFO_RATE_BASE: usize = ENV_BASE + ENV_PARAMS * 2;
const ZONE_SCALAR_BASE: usize = LFO_RATE_BASE + LFOS_PER_ZONE;
const PROC_MIX_BASE: usize = ZONE_SCALAR_BASE + 6;
const PROC_PARAM_BASE: usize = PROC_MIX_BASE + PROCESSORS_PER_ZONE;
pub const NUM_TARGET_SLOTS: usize =
    PROC_PARAM_BASE + PROCESSORS_PER_ZONE * MAX_PROCESSOR_FLOAT_PARAMS;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceModSource {
    #[default]
    None,
    Aeg,
    Eg2,
    Lfo1,
    Lfo2,
    Lfo3,
    Velocity,
    KeyTrack,
    PitchBend,
    ModWheel,
}

pub const NUM_VOICE_SOURCES: usize = 10;

impl VoiceModSource {
    pub fn lfo(index: usize) -> Self {
        match index {
            0 => VoiceModSource::Lfo1,
            1 => VoiceModSource::Lfo2,
            _ => VoiceModSource::Lfo3,
        }
    }
}

/// Envelope parameters addressable by the matrix.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvParam {
    A,
    H,
    D,
    S,
    R,
    AShape,
    DShape,
    RShape,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceModTarget {
    /// Parameter of envelope 0 (AEG) or 1 (EG2).
    Env(usize, EnvParam),
    LfoRate(usize),
    SamplePitchOffset,
    SamplePlaybackRatio,
    SamplePan,
    SampleAmplitude,
    OutputPan,
    OutputAmplitude,
    ProcessorMix(usize),
    ProcessorParam(usize, usize),
}

impl VoiceModTarget {
    /// Flat slot index, or `None` for an out-of-range target.
    pub fn slot(self) -> Option<usize> {
        match self {
            VoiceModTarget::Env(e, p) if e < 2 => Some(ENV_BASE + e * ENV_PARAMS + p as usize),
            VoiceModTarget::LfoRate(i) if i < LFOS_PER_ZONE => Some(LFO_RATE_BASE + i),
            VoiceModTarget::SamplePitchOffset => Some(ZONE_SCALAR_BASE),
            VoiceModTarget::SamplePlaybackRatio => Some(ZONE_SCALAR_BASE + 1),
            VoiceModTarget::SamplePan => Some(ZONE_SCALAR_BASE + 2),
            VoiceModTarget::SampleAmplitude => Some(ZONE_SCALAR_BASE + 3),
            VoiceModTarget::OutputPan => Some(ZONE_SCALAR_BASE + 4),
            VoiceModTarget::OutputAmplitude => Some(ZONE_SCALAR_BASE + 5),
            VoiceModTarget::ProcessorMix(i) if i < PROCESSORS_PER_ZONE => Some(PROC_MIX_BASE + i),
            VoiceModTarget::ProcessorParam(i, p)
                if i < PROCESSORS_PER_ZONE && p < MAX_PROCESSOR_FLOAT_PARAMS =>
            {
                Some(PROC_PARAM_BASE + i * MAX_PROCESSOR_FLOAT_PARAMS + p)
            }
            _ => None,
        }
    }

    fn range(self) -> (f32, f32) {
        match self {
            VoiceModTarget::Env(_, EnvParam::AShape | EnvParam::DShape | EnvParam::RShape) => {
                (-1.0, 1.0)
            }
            VoiceModTarget::Env(..) => (0.0, 1.0),
            VoiceModTarget::LfoRate(_) => (-10.0, 10.0),
            VoiceModTarget::SamplePitchOffset => (-128.0, 128.0),
            VoiceModTarget::SamplePlaybackRatio => (-0.99, 16.0),
            VoiceModTarget::SamplePan | VoiceModTarget::OutputPan => (-1.0, 1.0),
            VoiceModTarget::SampleAmplitude => (0.0, 4.0),
            VoiceModTarget::OutputAmplitude => (0.0, 2.0),
            VoiceModTarget::ProcessorMix(_) => (0.0, 1.0),
            VoiceModTarget::ProcessorParam(..) => (-100_000.0, 100_000.0),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModRoute {
    pub active: bool,
    pub source: VoiceModSource,
    pub target: Option<VoiceModTarget>,
    pub depth: f32,
}

impl ModRoute {
    pub fn new(source: VoiceModSource, target: VoiceModTarget, depth: f32) -> Self {
        Self {
            active: true,
            source,
            target: Some(target),
            depth,
        }
    }
}

pub type VoiceRoutingTable = [ModRoute; MOD_MATRIX_SLOTS];

#[derive(Debug, Clone, Copy)]
struct ResolvedRoute {
    source: usize,
    slot: usize,
    depth: f32,
}

#[derive(Debug, Clone)]
pub struct VoiceModMatrix {
    routes: [Option<ResolvedRoute>; MOD_MATRIX_SLOTS],
    sources: [f32; NUM_VOICE_SOURCES],
    base: [f32; NUM_TARGET_SLOTS],
    values: [f32; NUM_TARGET_SLOTS],
    lo: [f32; NUM_TARGET_SLOTS],
    hi: [f32; NUM_TARGET_SLOTS],
}

impl Default for VoiceModMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceModMatrix {
    pub fn new() -> Self {
        let mut lo = [f32::MIN; NUM_TARGET_SLOTS];
        let mut hi = [f32::MAX; NUM_TARGET_SLOTS];
        for target in all_targets() {
            if let Some(slot) = target.slot() {
                let (l, h) = target.range();
                lo[slot] = l;
                hi[slot] = h;
            }
        }
        Self {
            routes: [None; MOD_MATRIX_SLOTS],
            sources: [0.0; NUM_VOICE_SOURCES],
            base: [0.0; NUM_TARGET_SLOTS],
            values: [0.0; NUM_TARGET_SLOTS],
            lo,
            hi,
        }
    }

    /// Take the zone's routing table as of voice start.
    pub fn snap_routing_from_zone(&mut self, zone: &Zone) {
        for (dst, route) in self.routes.iter_mut().zip(zone.routing_table.iter()) {
            *dst = match (route.active, route.source, route.target.and_then(|t| t.slot())) {
                (true, source, Some(slot)) if source != VoiceModSource::None => {
                    Some(ResolvedRoute {
                        source: source as usize,
                        slot,
                        depth: if route.depth.is_finite() { route.depth } else { 0.0 },
                    })
                }
                _ => None,
            };
        }
    }

    pub fn copy_base_values_from_zone(&mut self, zone: &Zone) {
        for (e, storage) in [&zone.aeg_storage, &zone.eg2_storage].into_iter().enumerate() {
            let b = ENV_BASE + e * ENV_PARAMS;
            self.base[b..b + ENV_PARAMS].copy_from_slice(&[
                storage.a,
                storage.h,
                storage.d,
                storage.s,
                storage.r,
                storage.a_shape,
                storage.d_shape,
                storage.r_shape,
            ]);
        }
        for (i, lfo) in zone.lfo_storage.iter().enumerate() {
            self.base[LFO_RATE_BASE + i] = lfo.rate;
        }
        let z = ZONE_SCALAR_BASE;
        self.base[z] = zone.mapping.pitch_offset;
        self.base[z + 1] = 0.0;
        self.base[z + 2] = zone.mapping.pan;
        self.base[z + 3] = zone.mapping.amplitude;
        self.base[z + 4] = zone.output_info.pan;
        self.base[z + 5] = zone.output_info.amplitude;
        for (i, p) in zone.processor_storage.iter().enumerate() {
            self.base[PROC_MIX_BASE + i] = p.mix;
            let b = PROC_PARAM_BASE + i * MAX_PROCESSOR_FLOAT_PARAMS;
            self.base[b..b + MAX_PROCESSOR_FLOAT_PARAMS].copy_from_slice(&p.float_params);
        }
    }

    #[inline]
    pub fn set_source(&mut self, source: VoiceModSource, value: f32) {
        self.sources[source as usize] = if value.is_finite() { value } else { 0.0 };
    }

    pub fn process(&mut self) {
        self.values = self.base;
        for route in self.routes.iter().flatten() {
            self.values[route.slot] += self.sources[route.source] * route.depth;
        }
        for i in 0..NUM_TARGET_SLOTS {
            let v = self.values[i];
            self.values[i] = if v.is_finite() {
                v.clamp(self.lo[i], self.hi[i])
            } else if self.base[i].is_finite() {
                self.base[i].clamp(self.lo[i], self.hi[i])
            } else {
                0.0
            };
        }
    }

    /// Current value of a target. Out-of-range targets read as zero.
    #[inline]
    pub fn value(&self, target: VoiceModTarget) -> f32 {
        target.slot().map_or(0.0, |s| self.values[s])
    }

    pub fn env_params(&self, env: usize) -> crate::dsp::AdsrStorage {
        let b = ENV_BASE + env.min(1) * ENV_PARAMS;
        let v = &self.values[b..b + ENV_PARAMS];
        crate::dsp::AdsrStorage {
            a: v[0],
            h: v[1],
            d: v[2],
            s: v[3],
            r: v[4],
            a_shape: v[5],
            d_shape: v[6],
            r_shape: v[7],
        }
    }

    /// The modulated float parameters of one processor slot.
    pub fn processor_params(&self, processor: usize) -> &[f32] {
        let b = PROC_PARAM_BASE + processor.min(PROCESSORS_PER_ZONE - 1) * MAX_PROCESSOR_FLOAT_PARAMS;
        &self.values[b..b + MAX_PROCESSOR_FLOAT_PARAMS]
    }
}

fn all_targets() -> impl Iterator<Item = VoiceModTarget> {
    use EnvParam::*;
    let env = (0..2).flat_map(|e| {
        [A, H, D, S, R, AShape, DShape, RShape]
            .into_iter()
            .map(move |p| VoiceModTarget::Env(e, p))
    });
    let lfo = (0..LFOS_PER_ZONE).map(VoiceModTarget::LfoRate);
    let scalars = [
        VoiceModTarget::SamplePitchOffset,
        VoiceModTarget::SamplePlaybackRatio,
        VoiceModTarget::SamplePan,
        VoiceModTarget::SampleAmplitude,
        VoiceModTarget::OutputPan,
        VoiceModTarget::OutputAmplitude,
    ];
    let mix = (0..PROCESSORS_PER_ZONE).map(VoiceModTarget::ProcessorMix);
    let params = (0..PROCESSORS_PER_ZONE).flat_map(|i| {
        (0..MAX_PROCESSOR_FLOAT_PARAMS).map(move |p| VoiceModTarget::ProcessorParam(i, p))
    });
    env.chain(lfo).chain(scalars).chain(mix).chain(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_unique_and_dense() {
        let mut seen = [false; NUM_TARGET_SLOTS];
        for target in all_targets() {
            let slot = target.slot().expect("every listed target has a slot");
            assert!(!seen[slot], "slot {} assigned twice", slot);
            seen[slot] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_out_of_range_targets_have_no_slot() {
        assert_eq!(VoiceModTarget::LfoRate(LFOS_PER_ZONE).slot(), None);
        assert_eq!(VoiceModTarget::ProcessorParam(0, MAX_PROCESSOR_FLOAT_PARAMS).slot(), None);
        assert_eq!(VoiceModTarget::Env(2, EnvParam::A).slot(), None);
    }

    #[test]
    fn test_route_adds_scaled_source() {
        let mut zone = Zone::new("test");
        zone.mapping.pan = 0.1;
        zone.routing_table[0] =
            ModRoute::new(VoiceModSource::Lfo1, VoiceModTarget::SamplePan, 0.5);
        let mut matrix = VoiceModMatrix::new();
        matrix.snap_routing_from_zone(&zone);
        matrix.copy_base_values_from_zone(&zone);
        matrix.set_source(VoiceModSource::Lfo1, 0.4);
        matrix.process();
        assert!((matrix.value(VoiceModTarget::SamplePan) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_values_clamped_and_nan_safe() {
        let mut zone = Zone::new("test");
        zone.routing_table[0] =
            ModRoute::new(VoiceModSource::Velocity, VoiceModTarget::OutputPan, 100.0);
        zone.routing_table[1] = ModRoute::new(
            VoiceModSource::ModWheel,
            VoiceModTarget::SampleAmplitude,
            f32::INFINITY,
        );
        let mut matrix = VoiceModMatrix::new();
        matrix.snap_routing_from_zone(&zone);
        matrix.copy_base_values_from_zone(&zone);
        matrix.set_source(VoiceModSource::Velocity, 1.0);
        matrix.set_source(VoiceModSource::ModWheel, f32::NAN);
        matrix.process();
        assert_eq!(matrix.value(VoiceModTarget::OutputPan), 1.0);
        assert_eq!(
            matrix.value(VoiceModTarget::SampleAmplitude),
            zone.mapping.amplitude
        );
    }

    #[test]
    fn test_inactive_and_dangling_routes_ignored() {
        let mut zone = Zone::new("test");
        zone.routing_table[0] = ModRoute {
            active: false,
            ..ModRoute::new(VoiceModSource::Aeg, VoiceModTarget::SamplePan, 1.0)
        };
        zone.routing_table[1] =
            ModRoute::new(VoiceModSource::Aeg, VoiceModTarget::ProcessorMix(99), 1.0);
        let mut matrix = VoiceModMatrix::new();
        matrix.snap_routing_from_zone(&zone);
        matrix.copy_base_values_from_zone(&zone);
        matrix.set_source(VoiceModSource::Aeg, 1.0);
        matrix.process();
        assert_eq!(matrix.value(VoiceModTarget::SamplePan), 0.0);
    }
}
