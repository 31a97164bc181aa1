//! Lookup tables built once when the engine is constructed and shared
//! read-only with every voice.

use std::f64::consts::PI;

/// Taps per interpolation kernel.
pub const FIR_TAPS: usize = 8;
/// Fractional positions per sample.
pub const FIR_PHASES: usize = 256;
/// Index of the tap that lines up with the integer sample position.
pub const FIR_CENTER: i32 = 3;

/*
Windowed-Sinc Interpolation
===========================

The generator reads samples at fractional positions. For a position
`pos + frac` the output is the weighted sum of the eight samples around it:

    taps:      pos-3  pos-2  pos-1  pos  pos+1  pos+2  pos+3  pos+4
    weights:    w0     w1     w2    w3    w4     w5     w6     w7

with `w_k = sinc(k - 3 - frac) * window(k - 3 - frac)` using a Blackman window
four samples wide on each side. Every row is normalized to sum to 1.0 so DC
passes at unity.

`frac` is quantized to FIR_PHASES steps. With a Q24 sub-position the phase
row is `subpos >> 16`. Row 0 is an exact unit impulse, so unity-rate playback
from an integer position returns the stored samples unchanged.
*/

pub struct SincTable {
    rows: Box<[[f32; FIR_TAPS]; FIR_PHASES]>,
}

impl SincTable {
    pub fn new() -> Self {
        let mut rows = Box::new([[0.0f32; FIR_TAPS]; FIR_PHASES]);
        for (phase, row) in rows.iter_mut().enumerate() {
            if phase == 0 {
                row[FIR_CENTER as usize] = 1.0;
                continue;
            }
            let frac = phase as f64 / FIR_PHASES as f64;
            let mut weights = [0.0f64; FIR_TAPS];
            for (k, w) in weights.iter_mut().enumerate() {
                let x = k as f64 - FIR_CENTER as f64 - frac;
                let sinc = (PI * x).sin() / (PI * x);
                let wx = x / (FIR_TAPS as f64 / 2.0);
                let window = 0.42 + 0.5 * (PI * wx).cos() + 0.08 * (2.0 * PI * wx).cos();
                *w = sinc * window.max(0.0);
            }
            let sum: f64 = weights.iter().sum();
            for (dst, w) in row.iter_mut().zip(weights.iter()) {
                *dst = (w / sum) as f32;
            }
        }
        Self { rows }
    }

    /// Kernel for a Q24 sub-sample position.
    #[inline]
    pub fn taps_for_subpos(&self, subpos: i32) -> &[f32; FIR_TAPS] {
        let phase = ((subpos >> 16) as usize) & (FIR_PHASES - 1);
        &self.rows[phase]
    }
}

impl Default for SincTable {
    fn default() -> Self {
        Self::new()
    }
}

const TUNING_MIN_NOTE: f32 = -256.0;
const TUNING_STEPS_PER_NOTE: usize = 32;
const TUNING_NOTES: usize = 512;
const TUNING_LEN: usize = TUNING_NOTES * TUNING_STEPS_PER_NOTE + 1;

/// Twelve-tone equal temperament: semitone offsets to frequency ratios.
pub struct EqualTuning {
    table: Box<[f32]>,
}

impl EqualTuning {
    pub fn new() -> Self {
        let table = (0..TUNING_LEN)
            .map(|i| {
                let note = TUNING_MIN_NOTE as f64 + i as f64 / TUNING_STEPS_PER_NOTE as f64;
                2.0f64.powf(note / 12.0) as f32
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { table }
    }

    /// `2^(semitones / 12)`, clamped to ±256 semitones.
    #[inline]
    pub fn note_to_pitch(&self, semitones: f32) -> f32 {
        if !semitones.is_finite() {
            return 1.0;
        }
        let pos = (semitones - TUNING_MIN_NOTE) * TUNING_STEPS_PER_NOTE as f32;
        let pos = pos.clamp(0.0, (TUNING_LEN - 1) as f32);
        let idx = (pos as usize).min(TUNING_LEN - 2);
        let frac = pos - idx as f32;
        let a = self.table[idx];
        if frac == 0.0 {
            return a;
        }
        a + (self.table[idx + 1] - a) * frac
    }
}

impl Default for EqualTuning {
    fn default() -> Self {
        Self::new()
    }
}

/// Every table the audio thread reads from.
#[derive(Default)]
pub struct Tables {
    pub sinc: SincTable,
    pub tuning: EqualTuning,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }
}
