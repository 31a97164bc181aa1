//! One playing instance of a zone.
//!
//! Voices live in the engine's fixed pool. A voice never owns its zone; it
//! carries a [`ZonePath`] and is handed the zone by reference each block.

/*
Voice Pipeline
==============

Per block, in order:

    1. base values ← zone                 (modulation matrix)
    2. step LFOs advance one block
    3. envelopes run with the matrix's (modulated) stage settings
         gate = note held            for NORMAL
              = generator running    for ONE_SHOT / ON_RELEASE
    4. matrix resolves every target
    5. pitch → Q24 ratio → generator (→ half-rate decimator when oversampled)
    6. sample pan / amplitude
    7. processor chain
    8. output pan / amplitude (cubic), × AEG, promote to stereo


Mono / Stereo Negotiation
-------------------------

`chain_is_mono` starts true for a mono sample. Each processor is run as:

    chain mono, processor mono → mono      process_mono, fade L
    chain mono, processor mono → stereo    process_mono, fade L and R, chain stereo
    chain mono, processor stereo only      copy L → R, process_stereo, chain stereo
    chain stereo                           process_stereo

Every result is crossfaded against the dry signal with the processor's
smoothed mix so a mix change never steps.

A mono chain that is never panned is scaled by 1/√2 once, so a centred mono
voice lands at the same power as the equal-power pan law would give.
*/

use std::f32::consts::FRAC_1_SQRT_2;

use rand::rngs::StdRng;
use tracing::trace;

use crate::dsp::amplify::{amp_to_gain, mul_block, scale_by};
use crate::dsp::envelope::Envelope;
use crate::dsp::halfband::HalfRateDecimator;
use crate::dsp::lipol::BlockInterpolator;
use crate::dsp::mix::{clear_stereo, copy_from_to, StereoBlock};
use crate::dsp::pan::{pan_mono_block, pan_stereo_block};
use crate::dsp::tables::Tables;
use crate::engine::memory_pool::MemoryPool;
use crate::engine::retune::MidiKeyRetuner;
use crate::engine::zone::{LoopDirection, LoopMode, PlayMode, Zone};
use crate::generator::{
    resolve_generator, silent_generator, GeneratorFn, GeneratorOutput, GeneratorState,
    OVERSAMPLING_RATIO_THRESHOLD,
};
use crate::modulation::step_lfo::StepLfo;
use crate::modulation::voice_matrix::{VoiceModMatrix, VoiceModSource, VoiceModTarget};
use crate::processor::{Processor, ProcessorContext};
use crate::sample::Sample;
use crate::{BLOCK_SIZE, BLOCK_SIZE_OS, LFOS_PER_ZONE, PROCESSORS_PER_ZONE};

/// Index of a slot in the engine's voice pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub usize);

/// Position of a zone in the patch tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZonePath {
    pub part: usize,
    pub group: usize,
    pub zone: usize,
}

impl ZonePath {
    pub fn new(part: usize, group: usize, zone: usize) -> Self {
        Self { part, group, zone }
    }
}

/// The note that started a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteInfo {
    pub channel: i16,
    /// Key after keyboard remapping.
    pub key: i16,
    /// Key as received.
    pub original_key: i16,
    pub note_id: i32,
    /// 0..=127
    pub velocity: i16,
}

/// Read-only state shared by every voice during a block.
pub struct VoiceContext<'a> {
    pub tables: &'a Tables,
    pub retuner: &'a MidiKeyRetuner,
    pub sample_rate: f32,
    /// Smoothed pitch bend of the owning part, -1..1.
    pub pitch_bend: f32,
    /// Smoothed mod wheel of the owning part, 0..1.
    pub mod_wheel: f32,
}

/// Extra inputs needed only when a voice starts.
pub struct VoiceStart<'a> {
    pub pool: &'a mut MemoryPool,
    pub rng: &'a mut StdRng,
    /// Seconds the engine has been running, for free-running LFOs.
    pub engine_seconds: f64,
}

pub struct Voice {
    pub id: VoiceId,
    pub path: ZonePath,
    pub note: NoteInfo,

    pub is_voice_assigned: bool,
    pub is_voice_playing: bool,
    pub is_gated: bool,
    pub is_generator_running: bool,

    pub output: StereoBlock,

    gd: GeneratorState,
    generator: GeneratorFn,
    gen_out: GeneratorOutput,
    mono_generator: bool,
    use_oversampling: bool,
    half_rate: HalfRateDecimator,

    aeg: Envelope,
    eg2: Envelope,
    lfos: [StepLfo; LFOS_PER_ZONE],
    mod_matrix: VoiceModMatrix,

    processors: [Option<Processor>; PROCESSORS_PER_ZONE],
    processor_consumes_mono: [bool; PROCESSORS_PER_ZONE],
    processor_produces_stereo: [bool; PROCESSORS_PER_ZONE],
    processor_mix: [BlockInterpolator; PROCESSORS_PER_ZONE],

    sample_pan: BlockInterpolator,
    sample_amp: BlockInterpolator,
    output_pan: BlockInterpolator,
    output_amp: BlockInterpolator,

    velocity_gain: f32,
    sample_rate: f32,
}

impl Voice {
    pub fn new(id: VoiceId, path: ZonePath, note: NoteInfo, sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            id,
            path,
            note,
            is_voice_assigned: true,
            is_voice_playing: false,
            is_gated: false,
            is_generator_running: false,
            output: [[0.0; BLOCK_SIZE]; 2],
            gd: GeneratorState::default(),
            generator: silent_generator,
            gen_out: [[0.0; BLOCK_SIZE_OS]; 2],
            mono_generator: true,
            use_oversampling: false,
            half_rate: HalfRateDecimator::steep(),
            aeg: Envelope::new(sample_rate),
            eg2: Envelope::new(sample_rate),
            lfos: std::array::from_fn(|_| StepLfo::new(sample_rate)),
            mod_matrix: VoiceModMatrix::new(),
            processors: std::array::from_fn(|_| None),
            processor_consumes_mono: [false; PROCESSORS_PER_ZONE],
            processor_produces_stereo: [false; PROCESSORS_PER_ZONE],
            processor_mix: [BlockInterpolator::new(); PROCESSORS_PER_ZONE],
            sample_pan: BlockInterpolator::new(),
            sample_amp: BlockInterpolator::new(),
            output_pan: BlockInterpolator::new(),
            output_amp: BlockInterpolator::new(),
            velocity_gain: 1.0,
            sample_rate,
        }
    }

    /// Bind the voice to its zone and start the attack. The caller registers
    /// the voice with the zone.
    pub fn voice_started(&mut self, zone: &Zone, ctx: &VoiceContext<'_>, start: VoiceStart<'_>) {
        self.sample_rate = ctx.sample_rate.max(1.0);
        self.aeg.set_sample_rate(self.sample_rate);
        self.eg2.set_sample_rate(self.sample_rate);
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(self.sample_rate);
        }

        self.mod_matrix.snap_routing_from_zone(zone);
        self.mod_matrix.copy_base_values_from_zone(zone);
        self.set_note_sources(ctx);
        self.mod_matrix.process();

        let velocity = self.note.velocity.clamp(0, 127) as f32 / 127.0;
        let sens = zone.mapping.velocity_sens.clamp(0.0, 1.0);
        self.velocity_gain = 1.0 - sens + sens * velocity;

        self.initialize_generator(zone, ctx);
        self.initialize_processors(zone, start.pool);

        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            let rate = self.mod_matrix.value(VoiceModTarget::LfoRate(i));
            lfo.assign(&zone.lfo_storage[i], rate, start.rng, start.engine_seconds);
        }

        self.aeg.attack_from(0.0);
        self.eg2.attack_from(0.0);

        self.sample_pan.set_target_instant(self.mod_matrix.value(VoiceModTarget::SamplePan));
        self.sample_amp.set_target_instant(self.sample_amp_target());
        self.output_pan.set_target_instant(self.mod_matrix.value(VoiceModTarget::OutputPan));
        self.output_amp.set_target_instant(self.output_amp_target());

        self.is_voice_assigned = true;
        self.is_voice_playing = true;
        self.is_gated = true;
        self.is_generator_running = true;
        trace!(
            voice = self.id.0,
            key = self.note.key,
            ratio = self.gd.ratio,
            oversampling = self.use_oversampling,
            "voice started"
        );
    }

    fn set_note_sources(&mut self, ctx: &VoiceContext<'_>) {
        let m = &mut self.mod_matrix;
        m.set_source(
            VoiceModSource::Velocity,
            self.note.velocity.clamp(0, 127) as f32 / 127.0,
        );
        m.set_source(VoiceModSource::KeyTrack, (self.note.key as f32 - 60.0) / 12.0);
        m.set_source(VoiceModSource::PitchBend, ctx.pitch_bend);
        m.set_source(VoiceModSource::ModWheel, ctx.mod_wheel);
    }

    fn sample_amp_target(&self) -> f32 {
        self.mod_matrix.value(VoiceModTarget::SampleAmplitude) * self.velocity_gain
    }

    fn output_amp_target(&self) -> f32 {
        amp_to_gain(self.mod_matrix.value(VoiceModTarget::OutputAmplitude))
    }

    fn initialize_generator(&mut self, zone: &Zone, ctx: &VoiceContext<'_>) {
        let Some(sample) = zone.sample_pointers[0].as_deref() else {
            self.gd = GeneratorState::default();
            self.generator = silent_generator;
            return;
        };
        let sdata = &zone.sample_data[0];
        let len = sample.sample_length() as i64;
        let resolve = |v: i64, fallback: i64| if v < 0 { fallback } else { v.min(len) };

        let start = resolve(sdata.start_sample, 0) as i32;
        let end = resolve(sdata.end_sample, len).max(start as i64) as i32;

        let mut gd = GeneratorState {
            sample_pos: start,
            sample_sub_pos: 0,
            loop_lower_bound: start,
            loop_upper_bound: end,
            playback_lower_bound: start,
            playback_upper_bound: end,
            direction: 1,
            is_finished: end <= start,
            gated: true,
            loops_remaining: -1,
            ..GeneratorState::default()
        };
        if sdata.loop_active {
            gd.loop_lower_bound = resolve(sdata.start_loop, start as i64) as i32;
            gd.loop_upper_bound = resolve(sdata.end_loop, end as i64) as i32;
            if sdata.loop_mode == LoopMode::LoopForCount {
                gd.loops_remaining = sdata.loop_count_when_counted.max(0);
            }
        }
        if sdata.play_reverse {
            gd.sample_pos = (end - 1).max(start);
            gd.direction = -1;
        }
        self.gd = gd;

        let pitch = self.calculate_voice_pitch(zone, ctx);
        self.calculate_generator_ratio(pitch, zone, sample, ctx.sample_rate);

        self.use_oversampling = self.gd.ratio.unsigned_abs() > OVERSAMPLING_RATIO_THRESHOLD as u32;
        self.gd.block_size = if self.use_oversampling {
            BLOCK_SIZE_OS
        } else {
            BLOCK_SIZE
        };
        self.half_rate.reset();

        self.mono_generator = !sample.is_stereo();
        self.generator = resolve_generator(
            sample.is_stereo(),
            sample.bit_depth(),
            sdata.loop_active,
            sdata.loop_direction == LoopDirection::ForwardOnly,
            sdata.loop_mode == LoopMode::LoopWhileGated,
        );
    }

    fn initialize_processors(&mut self, zone: &Zone, pool: &mut MemoryPool) {
        for i in 0..PROCESSORS_PER_ZONE {
            let storage = &zone.processor_storage[i];
            let processor = Processor::spawn(storage, pool, self.sample_rate);
            self.processor_consumes_mono[i] =
                processor.as_ref().is_some_and(Processor::can_process_mono);
            self.processor_produces_stereo[i] = processor
                .as_ref()
                .is_some_and(Processor::mono_input_creates_stereo_output);
            self.processors[i] = processor;
            self.processor_mix[i]
                .set_target_instant(self.mod_matrix.value(VoiceModTarget::ProcessorMix(i)));
        }
    }

    /// Semitone pitch of the voice: key, pitch offset, bend and retuning.
    fn calculate_voice_pitch(&self, zone: &Zone, ctx: &VoiceContext<'_>) -> f32 {
        let mut pitch =
            self.note.key as f32 + self.mod_matrix.value(VoiceModTarget::SamplePitchOffset);
        let bend = ctx.pitch_bend;
        let range = if bend > 0.0 {
            zone.mapping.pb_up
        } else {
            zone.mapping.pb_down
        };
        pitch += bend * range as f32;
        pitch += ctx.retuner.retune_remapped_key(
            self.note.channel,
            self.note.key,
            self.note.original_key,
        );
        pitch
    }

    fn calculate_generator_ratio(
        &mut self,
        pitch: f32,
        zone: &Zone,
        sample: &Sample,
        engine_sample_rate: f32,
    ) {
        let semis = pitch - zone.mapping.root_key as f32;
        let rate_ratio = sample.sample_rate as f64 / engine_sample_rate.max(1.0) as f64;
        let playback = 1.0 + self.mod_matrix.value(VoiceModTarget::SamplePlaybackRatio) as f64;
        let ratio = (1i64 << 24) as f64 * 2f64.powf(semis as f64 / 12.0) * rate_ratio * playback;
        self.gd.ratio = if ratio.is_finite() {
            ratio.clamp(0.0, i32::MAX as f64) as i32
        } else {
            1 << 24
        };
    }

    /// Start the release stage.
    pub fn release(&mut self) {
        self.is_gated = false;
    }

    /// Render one block into `output`.
    pub fn process(&mut self, zone: &Zone, ctx: &VoiceContext<'_>) {
        if !self.is_voice_playing || !self.is_voice_assigned {
            clear_stereo(&mut self.output);
            return;
        }
        let Some(sample) = zone.sample_pointers[0].as_deref() else {
            clear_stereo(&mut self.output);
            self.is_voice_playing = false;
            return;
        };
        let play_mode = zone.sample_data[0].play_mode;

        self.mod_matrix.copy_base_values_from_zone(zone);
        self.set_note_sources(ctx);

        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            let rate = self.mod_matrix.value(VoiceModTarget::LfoRate(i));
            lfo.process(&zone.lfo_storage[i], rate, BLOCK_SIZE, self.is_gated);
            self.mod_matrix.set_source(VoiceModSource::lfo(i), lfo.output);
        }

        let env_gate = match play_mode {
            PlayMode::Normal => self.is_gated,
            PlayMode::OneShot | PlayMode::OnRelease => self.is_generator_running,
        };
        self.aeg.process_block(&self.mod_matrix.env_params(0), env_gate);
        self.eg2.process_block(&self.mod_matrix.env_params(1), env_gate);
        self.mod_matrix.set_source(VoiceModSource::Aeg, self.aeg.output);
        self.mod_matrix.set_source(VoiceModSource::Eg2, self.eg2.output);
        let aeg_running = !self.aeg.is_complete();

        self.mod_matrix.process();

        let mut pitch = self.calculate_voice_pitch(zone, ctx);
        self.calculate_generator_ratio(pitch, zone, sample, ctx.sample_rate);
        if self.use_oversampling {
            self.gd.ratio >>= 1;
        }
        pitch -= 69.0;

        self.gd.gated = self.is_gated;
        if !self.gd.is_finished {
            (self.generator)(&mut self.gd, ctx.tables, sample, &mut self.gen_out);
            if self.use_oversampling {
                let [l, r] = &mut self.gen_out;
                self.half_rate.process_block_d2(l, r, BLOCK_SIZE_OS);
            }
            for (out, generated) in self.output.iter_mut().zip(self.gen_out.iter()) {
                out.copy_from_slice(&generated[..BLOCK_SIZE]);
            }
        } else {
            clear_stereo(&mut self.output);
        }
        if self.gd.is_finished {
            self.is_generator_running = false;
        }

        let mut chain_is_mono = self.mono_generator;

        let pvz = self.mod_matrix.value(VoiceModTarget::SamplePan);
        if pvz != 0.0 {
            self.sample_pan.set_target(pvz);
            chain_is_mono = self.pan_outputs_by(chain_is_mono, pvz);
        } else if chain_is_mono {
            mul_block(&mut self.output[0], FRAC_1_SQRT_2);
        }

        self.sample_amp.set_target(self.sample_amp_target());
        {
            let [l, r] = &mut self.output;
            if chain_is_mono {
                self.sample_amp.multiply_block(l);
            } else {
                self.sample_amp.multiply_2_blocks(l, r);
            }
        }

        chain_is_mono = self.run_processor_chain(zone, ctx, chain_is_mono, pitch);

        let pvo = self.mod_matrix.value(VoiceModTarget::OutputPan);
        if pvo != 0.0 {
            self.output_pan.set_target(pvo);
            chain_is_mono = self.pan_outputs_by(chain_is_mono, pvo);
        }

        self.output_amp.set_target(self.output_amp_target());
        let [l, r] = &mut self.output;
        if chain_is_mono {
            self.output_amp.multiply_block(l);
            scale_by(&self.aeg.output_cache, l);
            copy_from_to(l, r);
        } else {
            self.output_amp.multiply_2_blocks(l, r);
            scale_by(&self.aeg.output_cache, l);
            scale_by(&self.aeg.output_cache, r);
        }

        self.is_voice_playing = aeg_running;
    }

    /// Pan the output in place. Returns the new mono flag, which is always false.
    fn pan_outputs_by(&mut self, chain_is_mono: bool, pan: f32) -> bool {
        let [l, r] = &mut self.output;
        if chain_is_mono {
            pan_mono_block(pan, l, r);
        } else {
            pan_stereo_block(pan, l, r);
        }
        false
    }

    fn run_processor_chain(
        &mut self,
        zone: &Zone,
        ctx: &VoiceContext<'_>,
        mut chain_is_mono: bool,
        pitch: f32,
    ) -> bool {
        let mut tmp: StereoBlock = [[0.0; BLOCK_SIZE]; 2];
        let sample_rate_inv = 1.0 / self.sample_rate;

        for i in 0..PROCESSORS_PER_ZONE {
            let Some(processor) = self.processors[i].as_mut() else {
                continue;
            };
            let mix = &mut self.processor_mix[i];
            mix.set_target(self.mod_matrix.value(VoiceModTarget::ProcessorMix(i)));
            let pctx = ProcessorContext {
                sample_rate: self.sample_rate,
                sample_rate_inv,
                tables: ctx.tables,
                float_params: self.mod_matrix.processor_params(i),
                int_params: &zone.processor_storage[i].int_params,
            };
            let [out_l, out_r] = &mut self.output;
            let [tmp_l, tmp_r] = &mut tmp;
            let dry_l = *out_l;

            match (
                chain_is_mono,
                self.processor_consumes_mono[i],
                self.processor_produces_stereo[i],
            ) {
                (true, true, false) => {
                    processor.process_mono(&pctx, &dry_l, tmp_l, tmp_r, pitch);
                    mix.fade_blocks(&dry_l, tmp_l, out_l);
                }
                (true, true, true) => {
                    processor.process_mono(&pctx, &dry_l, tmp_l, tmp_r, pitch);
                    mix.fade_blocks(&dry_l, tmp_l, out_l);
                    mix.fade_blocks(&dry_l, tmp_r, out_r);
                    chain_is_mono = false;
                }
                (true, false, _) => {
                    copy_from_to(&dry_l, out_r);
                    processor.process_stereo(&pctx, &dry_l, &dry_l, tmp_l, tmp_r, pitch);
                    mix.fade_blocks(&dry_l, tmp_l, out_l);
                    mix.fade_blocks(&dry_l, tmp_r, out_r);
                    chain_is_mono = false;
                }
                (false, ..) => {
                    let dry_r = *out_r;
                    processor.process_stereo(&pctx, &dry_l, &dry_r, tmp_l, tmp_r, pitch);
                    mix.fade_blocks(&dry_l, tmp_l, out_l);
                    mix.fade_blocks(&dry_r, tmp_r, out_r);
                }
            }
        }
        chain_is_mono
    }

    /// Current envelope output, for display and tests.
    pub fn aeg_level(&self) -> f32 {
        self.aeg.output
    }

    pub fn generator_ratio(&self) -> i32 {
        self.gd.ratio
    }

    pub fn uses_oversampling(&self) -> bool {
        self.use_oversampling
    }

    pub fn sample_position(&self) -> i32 {
        self.gd.sample_pos
    }

    pub fn is_mono_generator(&self) -> bool {
        self.mono_generator
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.aeg.set_sample_rate(self.sample_rate);
        self.eg2.set_sample_rate(self.sample_rate);
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(self.sample_rate);
        }
    }

    /// Release processor memory and mark the slot free. Runs on the audio
    /// thread once the voice has finished.
    pub fn cleanup(&mut self, pool: &mut MemoryPool) {
        for slot in &mut self.processors {
            if let Some(mut processor) = slot.take() {
                processor.release_memory(pool);
            }
        }
        self.is_voice_assigned = false;
        self.is_voice_playing = false;
        self.is_gated = false;
        trace!(voice = self.id.0, "voice cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::zone::AssociatedSample;
    use crate::processor::{ProcessorStorage, ProcessorType};
    use crate::sample::SampleManager;
    use rand::SeedableRng;

    struct Rig {
        tables: Tables,
        retuner: MidiKeyRetuner,
        pool: MemoryPool,
        rng: StdRng,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                tables: Tables::new(),
                retuner: MidiKeyRetuner::new(),
                pool: MemoryPool::new(4_096, 8),
                rng: StdRng::seed_from_u64(1),
            }
        }

        fn ctx(&self, sample_rate: f32) -> VoiceContext<'_> {
            VoiceContext {
                tables: &self.tables,
                retuner: &self.retuner,
                sample_rate,
                pitch_bend: 0.0,
                mod_wheel: 0.0,
            }
        }
    }

    fn zone_with(data: Vec<Vec<f32>>, sample_rate: f32) -> Zone {
        let mut manager = SampleManager::new();
        let id = manager.add_sample(Sample::from_f32("s", sample_rate, data).unwrap());
        let mut zone = Zone::with_sample(id);
        assert!(zone.attach_to_sample(&manager, 0));
        zone
    }

    fn note(key: i16, velocity: i16) -> NoteInfo {
        NoteInfo {
            channel: 0,
            key,
            original_key: key,
            note_id: -1,
            velocity,
        }
    }

    fn start(rig: &mut Rig, zone: &Zone, key: i16, sample_rate: f32) -> Voice {
        start_at_velocity(rig, zone, key, 127, sample_rate)
    }

    fn start_at_velocity(
        rig: &mut Rig,
        zone: &Zone,
        key: i16,
        velocity: i16,
        sample_rate: f32,
    ) -> Voice {
        let mut voice =
            Voice::new(VoiceId(0), ZonePath::new(0, 0, 0), note(key, velocity), sample_rate);
        let Rig {
            tables,
            retuner,
            pool,
            rng,
        } = rig;
        let ctx = VoiceContext {
            tables,
            retuner,
            sample_rate,
            pitch_bend: 0.0,
            mod_wheel: 0.0,
        };
        voice.voice_started(
            zone,
            &ctx,
            VoiceStart {
                pool,
                rng,
                engine_seconds: 0.0,
            },
        );
        voice
    }

    #[test]
    fn test_unity_ratio_at_matching_rates() {
        let mut rig = Rig::new();
        let zone = zone_with(vec![vec![0.5; 1_000]], 44_100.0);
        let voice = start(&mut rig, &zone, 60, 44_100.0);
        assert_eq!(voice.generator_ratio(), 1 << 24);
        assert!(!voice.uses_oversampling());
        assert!(voice.is_mono_generator());
    }

    #[test]
    fn test_octave_up_uses_oversampling() {
        let mut rig = Rig::new();
        let zone = zone_with(vec![vec![0.5; 1_000]], 48_000.0);
        let voice = start(&mut rig, &zone, 72, 48_000.0);
        assert_eq!(voice.generator_ratio(), 2 << 24);
        assert!(voice.uses_oversampling());
    }

    #[test]
    fn test_sample_rate_scales_ratio() {
        let mut rig = Rig::new();
        let zone = zone_with(vec![vec![0.5; 1_000]], 24_000.0);
        let voice = start(&mut rig, &zone, 60, 48_000.0);
        assert_eq!(voice.generator_ratio(), 1 << 23);
    }

    fn identity_data() -> Vec<f32> {
        (0..20_000).map(|i| ((i * 37) % 101) as f32 / 101.0 - 0.5).collect()
    }

    /// Run past the default attack, then render one more block and return
    /// the frame offset of that block.
    fn settle(voice: &mut Voice, zone: &Zone, rig: &Rig) -> usize {
        let ctx = rig.ctx(48_000.0);
        let warmup = 64;
        for _ in 0..=warmup {
            voice.process(zone, &ctx);
        }
        warmup * BLOCK_SIZE
    }

    #[test]
    fn test_mono_identity_path_after_attack() {
        let data = identity_data();
        let zone = zone_with(vec![data.clone()], 48_000.0);
        for velocity in [127, 64, 1] {
            let mut rig = Rig::new();
            let mut voice = start_at_velocity(&mut rig, &zone, 60, velocity, 48_000.0);
            let base = settle(&mut voice, &zone, &rig);
            for i in 0..BLOCK_SIZE {
                let expected = data[base + i] * FRAC_1_SQRT_2;
                assert_eq!(voice.output[0][i], expected, "velocity {velocity}, left {i}");
                assert_eq!(voice.output[1][i], expected, "velocity {velocity}, right {i}");
            }
        }
    }

    #[test]
    fn test_velocity_sensitivity_scales_amplitude() {
        let data = identity_data();
        let mut zone = zone_with(vec![data.clone()], 48_000.0);
        zone.mapping.velocity_sens = 1.0;
        let mut rig = Rig::new();
        let mut voice = start_at_velocity(&mut rig, &zone, 60, 64, 48_000.0);
        let base = settle(&mut voice, &zone, &rig);
        let gain = 64.0 / 127.0;
        for i in 0..BLOCK_SIZE {
            let expected = data[base + i] * FRAC_1_SQRT_2 * gain;
            assert!(
                (voice.output[0][i] - expected).abs() < 1e-6,
                "sample {i}: {} vs {expected}",
                voice.output[0][i]
            );
        }
    }

    #[test]
    fn test_release_finishes_voice() {
        let mut rig = Rig::new();
        let zone = zone_with(vec![vec![0.25; 200_000]], 48_000.0);
        let mut voice = start(&mut rig, &zone, 60, 48_000.0);
        let ctx = rig.ctx(48_000.0);
        for _ in 0..10 {
            voice.process(&zone, &ctx);
        }
        assert!(voice.is_voice_playing);
        voice.release();
        let mut blocks = 0;
        while voice.is_voice_playing && blocks < 100_000 {
            voice.process(&zone, &ctx);
            blocks += 1;
        }
        assert!(!voice.is_voice_playing);
        assert!(voice.output.iter().flatten().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_one_shot_plays_through_after_release() {
        let mut rig = Rig::new();
        let mut zone = zone_with(vec![vec![0.25; 4_800]], 48_000.0);
        zone.sample_data[0].play_mode = PlayMode::OneShot;
        let mut voice = start(&mut rig, &zone, 60, 48_000.0);
        let ctx = rig.ctx(48_000.0);
        voice.release();
        for _ in 0..100 {
            voice.process(&zone, &ctx);
        }
        assert!(voice.is_generator_running, "one-shot keeps playing after note off");
        for _ in 0..100_000 {
            if !voice.is_voice_playing {
                break;
            }
            voice.process(&zone, &ctx);
        }
        assert!(!voice.is_generator_running);
        assert!(!voice.is_voice_playing);
    }

    #[test]
    fn test_reverse_starts_at_end() {
        let mut rig = Rig::new();
        let mut zone = zone_with(vec![vec![0.1; 1_000]], 48_000.0);
        zone.sample_data[0] = AssociatedSample {
            play_reverse: true,
            ..zone.sample_data[0]
        };
        let mut voice = start(&mut rig, &zone, 60, 48_000.0);
        assert_eq!(voice.sample_position(), 999);
        let ctx = rig.ctx(48_000.0);
        voice.process(&zone, &ctx);
        assert_eq!(voice.sample_position(), 999 - BLOCK_SIZE as i32);
    }

    #[test]
    fn test_sample_pan_makes_mono_stereo() {
        let mut rig = Rig::new();
        let mut zone = zone_with(vec![vec![0.5; 10_000]], 48_000.0);
        zone.mapping.pan = 1.0;
        let mut voice = start(&mut rig, &zone, 60, 48_000.0);
        let ctx = rig.ctx(48_000.0);
        for _ in 0..64 {
            voice.process(&zone, &ctx);
        }
        assert!(voice.output[0][0].abs() < 1e-6, "hard right silences left");
        assert!((voice.output[1][0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_processor_memory_returns_to_pool() {
        let mut rig = Rig::new();
        let mut zone = zone_with(vec![vec![0.5; 10_000]], 48_000.0);
        zone.processor_storage[0] = ProcessorStorage::new(ProcessorType::MicroDelay);
        let before = rig.pool.available();
        let mut voice = start(&mut rig, &zone, 60, 48_000.0);
        assert!(rig.pool.available() < before);
        let ctx = rig.ctx(48_000.0);
        for _ in 0..8 {
            voice.process(&zone, &ctx);
        }
        assert!(voice.output.iter().flatten().all(|s| s.is_finite()));
        voice.cleanup(&mut rig.pool);
        assert_eq!(rig.pool.available(), before);
        assert!(!voice.is_voice_assigned);
    }

    #[test]
    fn test_missing_sample_stops_voice() {
        let mut rig = Rig::new();
        let zone = Zone::new("empty");
        let mut voice = start(&mut rig, &zone, 60, 48_000.0);
        let ctx = rig.ctx(48_000.0);
        voice.process(&zone, &ctx);
        assert!(!voice.is_voice_playing);
        assert!(voice.output.iter().flatten().all(|&s| s == 0.0));
    }
}
