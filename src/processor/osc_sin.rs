//! Sine oscillator processor. Replaces its input with a sine tracking the
//! voice pitch; use the slot's mix to blend it with the dry signal.
//!
//! fp[0] is a pitch offset in semitones.

use std::f32::consts::TAU;

use super::{Block, ProcessorContext, ProcessorUnit};

/*
Quadrature Oscillator
---------------------

Rather than calling sin() per sample, the oscillator rotates a unit vector:

    u' = c·u - s·v        c = cos(ω), s = sin(ω)
    v' = s·u + c·v        ω = 2π·f / sr

(u, v) walks the unit circle and v is the sine output. Rounding slowly
changes the vector's length, so it is renormalized once per block.
*/

pub struct OscSin {
    u: f32,
    v: f32,
}

impl OscSin {
    pub fn new() -> Self {
        Self { u: 1.0, v: 0.0 }
    }

    fn render(&mut self, ctx: &ProcessorContext<'_>, pitch: f32, out: &mut Block) {
        let pitch = if pitch.is_finite() { pitch } else { 0.0 };
        let freq = 440.0 * ctx.tables.tuning.note_to_pitch(pitch + ctx.fp(0));
        let omega = TAU * (freq * ctx.sample_rate_inv).min(0.5);
        let (s, c) = omega.sin_cos();
        for o in out.iter_mut() {
            let u = c * self.u - s * self.v;
            let v = s * self.u + c * self.v;
            self.u = u;
            self.v = v;
            *o = v;
        }
        let norm = (self.u * self.u + self.v * self.v).sqrt();
        if norm > 0.0 && norm.is_finite() {
            self.u /= norm;
            self.v /= norm;
        } else {
            self.u = 1.0;
            self.v = 0.0;
        }
    }
}

impl Default for OscSin {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorUnit for OscSin {
    fn can_process_mono(&self) -> bool {
        true
    }

    fn process_stereo(
        &mut self,
        ctx: &ProcessorContext<'_>,
        _in_l: &Block,
        _in_r: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        pitch: f32,
    ) {
        self.render(ctx, pitch, out_l);
        out_r.copy_from_slice(out_l);
    }

    fn process_mono(
        &mut self,
        ctx: &ProcessorContext<'_>,
        _input: &Block,
        out_l: &mut Block,
        _out_r: &mut Block,
        pitch: f32,
    ) {
        self.render(ctx, pitch, out_l);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::tables::Tables;
    use crate::BLOCK_SIZE;

    #[test]
    fn test_sine_at_pitch() {
        let tables = Tables::new();
        let fp = [0.0; 9];
        let ctx = ProcessorContext {
            sample_rate: 48_000.0,
            sample_rate_inv: 1.0 / 48_000.0,
            tables: &tables,
            float_params: &fp,
            int_params: &[],
        };
        let mut osc = OscSin::new();
        let input = [0.0; BLOCK_SIZE];
        let mut out = [0.0; BLOCK_SIZE];
        let mut scratch = [0.0; BLOCK_SIZE];
        let mut rendered = Vec::new();
        // pitch 0 is A440
        for _ in 0..300 {
            osc.process_mono(&ctx, &input, &mut out, &mut scratch, 0.0);
            rendered.extend_from_slice(&out);
        }
        let crossings = rendered
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count();
        // 4800 samples at 48 kHz = 0.1 s → 44 cycles
        assert!((43..=45).contains(&crossings), "crossings {}", crossings);
        let peak = rendered.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
        assert!((peak - 1.0).abs() < 1e-3);
    }
}
