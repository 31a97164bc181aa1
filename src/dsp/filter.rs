use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::halfband::HalfRateDecimator;
use crate::dsp::tables::EqualTuning;
use crate::BLOCK_SIZE;

/*
SuperSVF
========

A resonant state-variable filter that runs internally at twice the engine
rate and decimates back down. It processes four lanes at once so stereo and
four-pole operation share one code path.

Vocabulary
----------

  lanes       Four parallel filter states. Two-pole stereo uses lanes 0 and 1.
              Four-pole feeds lanes 0/1 into lanes 2/3 for a second pole pair.

  F           Frequency coefficient, 2·sin(π·min(0.11, f/(4·sr))).

  Q           Damping. Lower Q means more resonance.

  ClipDamp    How strongly the band state is squashed when it grows. Keeps
              high resonance bounded.

  Gain        Output compensation, 1 - 0.65·Reso.


Coefficients
------------

  f        = 440 · 2^(cutoff)                    cutoff in octaves from A440
  Reso     = sqrt(clamp(resonance, 0, 1))
  over     = 0.05 (four pole) or 0.075 (two pole)
  Q        = min(2 - Reso·(2 + over) + F²·over·0.9, 2, 2 - 1.52·F)
  ClipDamp = 0.1 · Reso · F
  Gain     = 1 - 0.65 · Reso

Coefficients glide to their new values linearly over the 2·BLOCK_SIZE inner
steps of each block.


One Inner Step
--------------

    L  = R1 + F·R0          H  = x - L - Q·R0        B  = R0 + F·H
    L2 = L + F·B            H2 = x - L2 - Q·B        B2 = B + F·H2

    R0 = B2 · R2
    R1 = L2 · R2
    R2 = max(0.1, 1 - ClipDamp · B2²)

    out = [L2, B2, H2][mode] · Gain

R2 starts at zero, so the first step after a reset returns the raw stage
values and leaves R0/R1 cleared.


Per Input Sample
----------------

    two pole:   mid  = step(in)          last = step(in)
    four pole:  mid  = step(in0, in1, last0, last1)
                last = step(in0, in1, mid0, mid1)
                output lanes 2 and 3

`mid` and `last` form the 2× stream that the half-band decimator brings back
to the engine rate.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvfMode {
    LowPass,
    BandPass,
    HighPass,
}

impl SvfMode {
    pub fn from_index(i: i32) -> Self {
        match i {
            1 => SvfMode::BandPass,
            2 => SvfMode::HighPass,
            _ => SvfMode::LowPass,
        }
    }

    fn output_index(self) -> usize {
        match self {
            SvfMode::LowPass => 0,
            SvfMode::BandPass => 1,
            SvfMode::HighPass => 2,
        }
    }
}

type Lanes = [f32; 4];

const INV_2BLOCK: f32 = 1.0 / (2 * BLOCK_SIZE) as f32;

#[derive(Debug, Clone, Copy, Default)]
struct Coefficient {
    value: f32,
    delta: f32,
}

impl Coefficient {
    fn glide_to(&mut self, target: f32) {
        self.delta = (target - self.value) * INV_2BLOCK;
    }

    #[inline]
    fn step(&mut self) {
        self.value += self.delta;
    }
}

pub struct SuperSvf {
    reg: [Lanes; 3],
    freq: Coefficient,
    q: Coefficient,
    clip_damp: Coefficient,
    gain: Coefficient,
    last_output: Lanes,
    decimator: HalfRateDecimator,
    oversampled: [[f32; BLOCK_SIZE * 2]; 2],
    first_block: bool,
}

impl Default for SuperSvf {
    fn default() -> Self {
        Self::new()
    }
}

impl SuperSvf {
    pub fn new() -> Self {
        Self {
            reg: [[0.0; 4]; 3],
            freq: Coefficient::default(),
            q: Coefficient::default(),
            clip_damp: Coefficient::default(),
            gain: Coefficient::default(),
            last_output: [0.0; 4],
            decimator: HalfRateDecimator::light(),
            oversampled: [[0.0; BLOCK_SIZE * 2]; 2],
            first_block: true,
        }
    }

    pub fn reset(&mut self) {
        self.reg = [[0.0; 4]; 3];
        self.last_output = [0.0; 4];
        self.decimator.reset();
        self.first_block = true;
    }

    /// Set up this block's coefficient glide.
    pub fn calc_coeffs(
        &mut self,
        cutoff: f32,
        resonance: f32,
        four_pole: bool,
        sample_rate_inv: f32,
        tuning: &EqualTuning,
    ) {
        let cutoff = if cutoff.is_finite() { cutoff } else { 0.0 };
        let resonance = if resonance.is_finite() { resonance } else { 0.0 };

        let f = 440.0 * tuning.note_to_pitch(cutoff * 12.0);
        let f1 = 2.0 * (PI * (f * 0.25 * sample_rate_inv).min(0.11)).sin();
        let reso = resonance.clamp(0.0, 1.0).sqrt();
        let overshoot = if four_pole { 0.05 } else { 0.075 };
        let q1 = (2.0 - reso * (2.0 + overshoot) + f1 * f1 * overshoot * 0.9)
            .min(2.0)
            .min(2.0 - 1.52 * f1);
        let clip_damp = 0.1 * reso * f1;
        let gain = 1.0 - 0.65 * reso;

        if self.first_block {
            self.freq.value = f1;
            self.q.value = q1;
            self.clip_damp.value = clip_damp;
            self.gain.value = gain;
            self.first_block = false;
        }
        self.freq.glide_to(f1);
        self.q.glide_to(q1);
        self.clip_damp.glide_to(clip_damp);
        self.gain.glide_to(gain);
    }

    #[inline]
    fn step(&mut self, x: Lanes, mode: SvfMode) -> Lanes {
        self.freq.step();
        self.q.step();
        self.clip_damp.step();
        self.gain.step();

        let f = self.freq.value;
        let q = self.q.value;
        let cd = self.clip_damp.value;
        let gain = self.gain.value;
        let out_idx = mode.output_index();

        let mut out = [0.0; 4];
        for lane in 0..4 {
            let r0 = self.reg[0][lane];
            let r1 = self.reg[1][lane];
            let r2 = self.reg[2][lane];

            let l = r1 + f * r0;
            let h = x[lane] - l - q * r0;
            let b = r0 + f * h;
            let l2 = l + f * b;
            let h2 = x[lane] - l2 - q * b;
            let b2 = b + f * h2;

            self.reg[0][lane] = b2 * r2;
            self.reg[1][lane] = l2 * r2;
            self.reg[2][lane] = (1.0 - cd * b2 * b2).max(0.1);

            out[lane] = [l2, b2, h2][out_idx] * gain;
        }
        out
    }

    /// Filter one block. For mono operation pass `right = None`; `out_r` is
    /// then left untouched.
    pub fn process_block(
        &mut self,
        left: &[f32; BLOCK_SIZE],
        right: Option<&[f32; BLOCK_SIZE]>,
        mode: SvfMode,
        four_pole: bool,
        out_l: &mut [f32; BLOCK_SIZE],
        out_r: &mut [f32; BLOCK_SIZE],
    ) {
        for k in 0..BLOCK_SIZE {
            let in0 = left[k];
            let in1 = right.map_or(0.0, |r| r[k]);
            let (mid, last, lane) = if four_pole {
                let mid = self.step([in0, in1, self.last_output[0], self.last_output[1]], mode);
                let last = self.step([in0, in1, mid[0], mid[1]], mode);
                (mid, last, 2)
            } else {
                let mid = self.step([in0, in1, 0.0, 0.0], mode);
                let last = self.step([in0, in1, 0.0, 0.0], mode);
                (mid, last, 0)
            };
            self.last_output = last;
            self.oversampled[0][2 * k] = mid[lane];
            self.oversampled[0][2 * k + 1] = last[lane];
            self.oversampled[1][2 * k] = mid[lane + 1];
            self.oversampled[1][2 * k + 1] = last[lane + 1];
        }

        let [os_l, os_r] = &mut self.oversampled;
        self.decimator.process_block_d2(os_l, os_r, BLOCK_SIZE * 2);
        out_l.copy_from_slice(&os_l[..BLOCK_SIZE]);
        if right.is_some() {
            out_r.copy_from_slice(&os_r[..BLOCK_SIZE]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SR: f32 = 48_000.0;

    fn run_sine(
        freq_hz: f32,
        cutoff: f32,
        reso: f32,
        mode: SvfMode,
        four_pole: bool,
    ) -> f32 {
        let tuning = EqualTuning::new();
        let mut svf = SuperSvf::new();
        let mut peak = 0.0f32;
        let mut n = 0usize;
        for block in 0..400 {
            let mut input = [0.0; BLOCK_SIZE];
            for s in input.iter_mut() {
                *s = (TAU * freq_hz * n as f32 / SR).sin();
                n += 1;
            }
            svf.calc_coeffs(cutoff, reso, four_pole, 1.0 / SR, &tuning);
            let mut out_l = [0.0; BLOCK_SIZE];
            let mut out_r = [0.0; BLOCK_SIZE];
            svf.process_block(&input, Some(&input), mode, four_pole, &mut out_l, &mut out_r);
            if block > 200 {
                peak = out_l.iter().fold(peak, |acc, &x| acc.max(x.abs()));
                assert!(out_l.iter().all(|x| x.is_finite()));
            }
        }
        peak
    }

    #[test]
    fn test_lowpass_passes_low_rejects_high() {
        // cutoff 0 octaves = 440 Hz
        let low = run_sine(55.0, 0.0, 0.0, SvfMode::LowPass, false);
        let high = run_sine(7_040.0, 0.0, 0.0, SvfMode::LowPass, false);
        assert!(low > 0.7, "low peak {}", low);
        assert!(high < 0.05, "high peak {}", high);
    }

    #[test]
    fn test_highpass_rejects_low() {
        let low = run_sine(27.5, 0.0, 0.0, SvfMode::HighPass, false);
        let high = run_sine(7_040.0, 0.0, 0.0, SvfMode::HighPass, false);
        assert!(low < 0.05, "low peak {}", low);
        assert!(high > 0.7, "high peak {}", high);
    }

    #[test]
    fn test_four_pole_is_steeper() {
        let two = run_sine(3_520.0, 0.0, 0.0, SvfMode::LowPass, false);
        let four = run_sine(3_520.0, 0.0, 0.0, SvfMode::LowPass, true);
        assert!(four < two, "two {} four {}", two, four);
    }

    #[test]
    fn test_full_resonance_stays_bounded() {
        let peak = run_sine(440.0, 0.0, 1.0, SvfMode::BandPass, false);
        assert!(peak.is_finite() && peak < 50.0, "peak {}", peak);
    }

    #[test]
    fn test_mono_leaves_right_untouched() {
        let tuning = EqualTuning::new();
        let mut svf = SuperSvf::new();
        svf.calc_coeffs(1.0, 0.2, false, 1.0 / SR, &tuning);
        let input = [0.5; BLOCK_SIZE];
        let mut out_l = [0.0; BLOCK_SIZE];
        let mut out_r = [7.0; BLOCK_SIZE];
        svf.process_block(&input, None, SvfMode::LowPass, false, &mut out_l, &mut out_r);
        assert!(out_r.iter().all(|&x| x == 7.0));
    }
}
