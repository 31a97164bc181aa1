//! Sample playback generator.
//!
//! Reads a [`Sample`] at a Q24 fixed-point rate through an eight-tap windowed
//! sinc and writes one block of mono or stereo output.

/*
Fixed-Point Position
====================

The read head is an integer frame index plus a 24-bit fraction:

    pos_q24 = (sample_pos << 24) + sample_sub_pos

Each output sample advances the head by `direction * ratio`, where `ratio` is
the playback rate in Q24 (1 << 24 plays the sample at its own rate).

    ratio = (1 << 24) · 2^((pitch - root_key) / 12) · sample_rate / engine_rate


Loops
-----

    playback:  start ────────────────────────────────────────── end
    loop:              loop_start ─────────── loop_end

    forward loop     pos ≥ loop_end      →  wrap to loop_start (modulo length)
                     pos < loop_start    →  wrap to loop_end   (reverse play)
    alternate loop   pos ≥ loop_end      →  reflect, direction = -1
                     pos < loop_start    →  reflect, direction = +1

Outside a loop, leaving [start, end) finishes the generator. Once finished it
writes silence and never reads sample memory again.

A loop only holds the head while it is "active". While-gated loops release
the head when the note is released, and counted loops release it after the
requested number of wraps.


Specialisation
--------------

The inner loop is generic over the sample storage type and four flags:

    STEREO        read and write two channels
    LOOP          honour loop bounds at all
    FORWARD       forward wrap vs alternate reflection
    WHILE_GATED   loop only while `gated` is true

The voice resolves one concrete instance to a plain `fn` pointer when it
starts, so the per-sample loop never branches on those flags.
*/

use crate::dsp::tables::{Tables, FIR_CENTER};
use crate::sample::{BitDepth, Sample};
use crate::BLOCK_SIZE_OS;

/// Above this Q24 ratio the voice renders at twice the engine rate.
pub const OVERSAMPLING_RATIO_THRESHOLD: i32 = 18_000_000;

const Q24_ONE: i64 = 1 << 24;
const Q24_MASK: i64 = Q24_ONE - 1;

#[derive(Debug, Clone, Copy)]
pub struct GeneratorState {
    pub sample_pos: i32,
    pub sample_sub_pos: i32,
    pub ratio: i32,
    pub direction: i32,
    pub loop_lower_bound: i32,
    pub loop_upper_bound: i32,
    pub playback_lower_bound: i32,
    pub playback_upper_bound: i32,
    /// Remaining wraps for a counted loop; negative means unlimited.
    pub loops_remaining: i32,
    pub is_finished: bool,
    pub gated: bool,
    /// Output samples per call; `BLOCK_SIZE` or `BLOCK_SIZE_OS`.
    pub block_size: usize,
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self {
            sample_pos: 0,
            sample_sub_pos: 0,
            ratio: 1 << 24,
            direction: 1,
            loop_lower_bound: 0,
            loop_upper_bound: 0,
            playback_lower_bound: 0,
            playback_upper_bound: 0,
            loops_remaining: -1,
            is_finished: true,
            gated: false,
            block_size: crate::BLOCK_SIZE,
        }
    }
}

pub type GeneratorOutput = [[f32; BLOCK_SIZE_OS]; 2];

pub type GeneratorFn = fn(&mut GeneratorState, &Tables, &Sample, &mut GeneratorOutput);

/// Storage formats the generator can read.
pub trait SampleFormat: Copy {
    fn channel(sample: &Sample, channel: usize) -> &[Self];
    fn to_f32(self) -> f32;
}

impl SampleFormat for f32 {
    #[inline]
    fn channel(sample: &Sample, channel: usize) -> &[Self] {
        sample.channel_f32(channel)
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl SampleFormat for i16 {
    #[inline]
    fn channel(sample: &Sample, channel: usize) -> &[Self] {
        sample.channel_i16(channel)
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 * (1.0 / 32_768.0)
    }
}

fn generate<
    T: SampleFormat,
    const STEREO: bool,
    const LOOP: bool,
    const FORWARD: bool,
    const WHILE_GATED: bool,
>(
    gd: &mut GeneratorState,
    tables: &Tables,
    sample: &Sample,
    out: &mut GeneratorOutput,
) {
    let data_l = T::channel(sample, 0);
    let data_r = if STEREO { T::channel(sample, 1) } else { data_l };
    let len = data_l.len().min(data_r.len()) as i32;
    let block = gd.block_size.min(BLOCK_SIZE_OS);

    if len == 0 {
        gd.is_finished = true;
    }

    for i in 0..block {
        if gd.is_finished {
            out[0][i] = 0.0;
            if STEREO {
                out[1][i] = 0.0;
            }
            continue;
        }

        let taps = tables.sinc.taps_for_subpos(gd.sample_sub_pos);
        let mut l = 0.0f32;
        let mut r = 0.0f32;
        for (k, &w) in taps.iter().enumerate() {
            let idx = (gd.sample_pos + k as i32 - FIR_CENTER).clamp(0, len - 1) as usize;
            l += w * data_l[idx].to_f32();
            if STEREO {
                r += w * data_r[idx].to_f32();
            }
        }
        out[0][i] = l;
        if STEREO {
            out[1][i] = r;
        }

        let pos = ((gd.sample_pos as i64) << 24)
            + gd.sample_sub_pos as i64
            + gd.ratio as i64 * gd.direction as i64;
        gd.sample_pos = (pos >> 24) as i32;
        gd.sample_sub_pos = (pos & Q24_MASK) as i32;

        let looping =
            LOOP && (!WHILE_GATED || gd.gated) && gd.loops_remaining != 0;
        if looping {
            let lower = gd.loop_lower_bound;
            let upper = gd.loop_upper_bound.max(lower + 1);
            let span = upper - lower;
            let mut wrapped = false;
            if FORWARD {
                if gd.direction > 0 && gd.sample_pos >= upper {
                    gd.sample_pos = lower + (gd.sample_pos - lower).rem_euclid(span);
                    wrapped = true;
                } else if gd.direction < 0 && gd.sample_pos < lower {
                    gd.sample_pos = lower + (gd.sample_pos - lower).rem_euclid(span);
                    wrapped = true;
                }
            } else if gd.direction > 0 && gd.sample_pos >= upper {
                gd.sample_pos = (upper - 1 - (gd.sample_pos - upper)).clamp(lower, upper - 1);
                gd.direction = -1;
                wrapped = true;
            } else if gd.direction < 0 && gd.sample_pos < lower {
                gd.sample_pos = (lower + (lower - gd.sample_pos)).clamp(lower, upper - 1);
                gd.direction = 1;
                wrapped = true;
            }
            if wrapped && gd.loops_remaining > 0 {
                gd.loops_remaining -= 1;
            }
        } else if gd.sample_pos >= gd.playback_upper_bound.min(len)
            || gd.sample_pos < gd.playback_lower_bound
        {
            gd.is_finished = true;
        }
    }
}

fn resolve_for<T: SampleFormat, const STEREO: bool>(
    looping: bool,
    forward: bool,
    while_gated: bool,
) -> GeneratorFn {
    match (looping, forward, while_gated) {
        (false, _, _) => generate::<T, STEREO, false, true, false> as GeneratorFn,
        (true, true, false) => generate::<T, STEREO, true, true, false>,
        (true, true, true) => generate::<T, STEREO, true, true, true>,
        (true, false, false) => generate::<T, STEREO, true, false, false>,
        (true, false, true) => generate::<T, STEREO, true, false, true>,
    }
}

/// Pick the specialised generator for a sample and loop configuration.
pub fn resolve_generator(
    stereo: bool,
    bit_depth: BitDepth,
    looping: bool,
    forward: bool,
    while_gated: bool,
) -> GeneratorFn {
    match (bit_depth, stereo) {
        (BitDepth::F32, true) => resolve_for::<f32, true>(looping, forward, while_gated),
        (BitDepth::F32, false) => resolve_for::<f32, false>(looping, forward, while_gated),
        (BitDepth::I16, true) => resolve_for::<i16, true>(looping, forward, while_gated),
        (BitDepth::I16, false) => resolve_for::<i16, false>(looping, forward, while_gated),
    }
}

/// Placeholder used before a voice has resolved its generator.
pub fn silent_generator(
    gd: &mut GeneratorState,
    _: &Tables,
    _: &Sample,
    out: &mut GeneratorOutput,
) {
    gd.is_finished = true;
    out[0].fill(0.0);
    out[1].fill(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BLOCK_SIZE;

    fn ramp_sample(len: usize) -> Sample {
        let data = (0..len).map(|i| i as f32 / len as f32).collect();
        Sample::from_f32("ramp", 48_000.0, vec![data]).unwrap()
    }

    fn state_for(sample: &Sample) -> GeneratorState {
        GeneratorState {
            is_finished: false,
            playback_upper_bound: sample.sample_length() as i32,
            loop_upper_bound: sample.sample_length() as i32,
            ..GeneratorState::default()
        }
    }

    #[test]
    fn test_unity_ratio_reproduces_samples() {
        let tables = Tables::new();
        let sample = ramp_sample(256);
        let mut gd = state_for(&sample);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        let generator = resolve_generator(false, BitDepth::F32, false, true, false);
        generator(&mut gd, &tables, &sample, &mut out);
        for i in 0..BLOCK_SIZE {
            assert_eq!(out[0][i], sample.channel_f32(0)[i]);
        }
        assert_eq!(gd.sample_pos, BLOCK_SIZE as i32);
        assert_eq!(gd.sample_sub_pos, 0);
    }

    #[test]
    fn test_half_ratio_advances_half() {
        let tables = Tables::new();
        let sample = ramp_sample(256);
        let mut gd = state_for(&sample);
        gd.ratio = 1 << 23;
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        resolve_generator(false, BitDepth::F32, false, true, false)(&mut gd, &tables, &sample, &mut out);
        assert_eq!(gd.sample_pos, (BLOCK_SIZE / 2) as i32);
    }

    #[test]
    fn test_one_shot_finishes_and_goes_silent() {
        let tables = Tables::new();
        let sample = ramp_sample(40);
        let mut gd = state_for(&sample);
        let mut out = [[1.0; BLOCK_SIZE_OS]; 2];
        let generator = resolve_generator(false, BitDepth::F32, false, true, false);
        for _ in 0..4 {
            generator(&mut gd, &tables, &sample, &mut out);
        }
        assert!(gd.is_finished);
        assert!(out[0][..BLOCK_SIZE].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_forward_loop_stays_in_bounds() {
        let tables = Tables::new();
        let sample = ramp_sample(200);
        let mut gd = state_for(&sample);
        gd.loop_lower_bound = 50;
        gd.loop_upper_bound = 70;
        gd.ratio = (1 << 24) * 3 / 2;
        let generator = resolve_generator(false, BitDepth::F32, true, true, false);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        for _ in 0..200 {
            generator(&mut gd, &tables, &sample, &mut out);
            assert!(!gd.is_finished);
            assert!(gd.sample_pos < 70, "pos {}", gd.sample_pos);
        }
        assert!(gd.sample_pos >= 50);
    }

    #[test]
    fn test_alternate_loop_reverses() {
        let tables = Tables::new();
        let sample = ramp_sample(200);
        let mut gd = state_for(&sample);
        gd.loop_lower_bound = 10;
        gd.loop_upper_bound = 30;
        let generator = resolve_generator(false, BitDepth::F32, true, false, false);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        let mut saw_reverse = false;
        for _ in 0..50 {
            generator(&mut gd, &tables, &sample, &mut out);
            saw_reverse |= gd.direction < 0;
            assert!((0..30).contains(&gd.sample_pos));
        }
        assert!(saw_reverse);
    }

    #[test]
    fn test_while_gated_loop_releases() {
        let tables = Tables::new();
        let sample = ramp_sample(100);
        let mut gd = state_for(&sample);
        gd.loop_lower_bound = 0;
        gd.loop_upper_bound = 20;
        gd.gated = true;
        let generator = resolve_generator(false, BitDepth::F32, true, true, true);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        for _ in 0..20 {
            generator(&mut gd, &tables, &sample, &mut out);
        }
        assert!(!gd.is_finished);
        gd.gated = false;
        for _ in 0..20 {
            generator(&mut gd, &tables, &sample, &mut out);
        }
        assert!(gd.is_finished);
    }

    #[test]
    fn test_counted_loop_runs_out() {
        let tables = Tables::new();
        let sample = ramp_sample(100);
        let mut gd = state_for(&sample);
        gd.loop_upper_bound = 16;
        gd.loops_remaining = 2;
        let generator = resolve_generator(false, BitDepth::F32, true, true, false);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        for _ in 0..20 {
            generator(&mut gd, &tables, &sample, &mut out);
        }
        assert_eq!(gd.loops_remaining, 0);
        assert!(gd.is_finished);
    }

    #[test]
    fn test_reverse_playback_finishes_at_start() {
        let tables = Tables::new();
        let sample = ramp_sample(64);
        let mut gd = state_for(&sample);
        gd.sample_pos = 63;
        gd.direction = -1;
        let generator = resolve_generator(false, BitDepth::F32, false, true, false);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        generator(&mut gd, &tables, &sample, &mut out);
        assert!(out[0][1] < out[0][0]);
        for _ in 0..4 {
            generator(&mut gd, &tables, &sample, &mut out);
        }
        assert!(gd.is_finished);
    }

    #[test]
    fn test_i16_stereo_reads_both_channels() {
        let tables = Tables::new();
        let left = vec![16_384i16; 64];
        let right = vec![-16_384i16; 64];
        let sample = Sample::from_i16("st", 48_000.0, vec![left, right]).unwrap();
        let mut gd = state_for(&sample);
        let mut out = [[0.0; BLOCK_SIZE_OS]; 2];
        resolve_generator(true, BitDepth::I16, false, true, false)(&mut gd, &tables, &sample, &mut out);
        assert!((out[0][0] - 0.5).abs() < 1e-6);
        assert!((out[1][0] + 0.5).abs() < 1e-6);
    }
}
