//! Waveshaper processor.
//!
//! | param  | meaning                                  |
//! | ------ | ---------------------------------------- |
//! | fp[0]  | drive in dB, 0..48                       |
//! | fp[1]  | output trim in dB, -48..12               |
//! | ip[0]  | shape: 0 soft clip, 1 hard clip, 2 fold  |

/*
Waveshaping
===========

A waveshaper applies a transfer function to each sample:

    output = f(input * drive)

Low drive keeps the signal in the near-linear part of f(); more drive pushes
it into the curve and adds harmonics.

  Soft clip   f(x) = x / (1 + |x|)       smooth, compresses peaks
  Hard clip   f(x) = clamp(x, -1, 1)     buzzy, odd harmonics
  Fold        reflect back off ±1        metallic, dense harmonics

Drive and trim ramp across each block so automation does not zipper.
*/

use super::{Block, ProcessorContext, ProcessorUnit};
use crate::dsp::amplify::db_to_linear;
use crate::dsp::lipol::BlockInterpolator;
use crate::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Soft,
    Hard,
    Fold,
}

impl Shape {
    fn from_index(i: i32) -> Self {
        match i {
            1 => Shape::Hard,
            2 => Shape::Fold,
            _ => Shape::Soft,
        }
    }
}

#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x / (1.0 + x.abs())
}

#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Reflect off ±1 until the value lies inside.
#[inline]
pub fn fold(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    // period-4 triangle: identity on [-1, 1]
    let t = (x + 1.0).rem_euclid(4.0);
    if t <= 2.0 {
        t - 1.0
    } else {
        3.0 - t
    }
}

#[inline]
fn shape_sample(shape: Shape, x: f32) -> f32 {
    match shape {
        Shape::Soft => soft_clip(x),
        Shape::Hard => hard_clip(x),
        Shape::Fold => fold(x),
    }
}

pub struct Waveshaper {
    drive: BlockInterpolator,
    trim: BlockInterpolator,
    first_block: bool,
}

impl Waveshaper {
    pub fn new() -> Self {
        Self {
            drive: BlockInterpolator::new(),
            trim: BlockInterpolator::new(),
            first_block: true,
        }
    }

    fn update(&mut self, ctx: &ProcessorContext<'_>) -> Shape {
        let drive = db_to_linear(ctx.fp(0).clamp(0.0, 48.0));
        let trim = db_to_linear(ctx.fp(1).clamp(-48.0, 12.0));
        if self.first_block {
            self.drive.set_target_instant(drive);
            self.trim.set_target_instant(trim);
            self.first_block = false;
        } else {
            self.drive.set_target(drive);
            self.trim.set_target(trim);
        }
        Shape::from_index(ctx.ip(0))
    }

    fn shape_block(&self, shape: Shape, input: &Block, out: &mut Block) {
        let mut drive = [0.0; BLOCK_SIZE];
        self.drive.store_block(&mut drive);
        for i in 0..BLOCK_SIZE {
            out[i] = shape_sample(shape, input[i] * drive[i]);
        }
        self.trim.multiply_block(out);
    }
}

impl Default for Waveshaper {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorUnit for Waveshaper {
    fn can_process_mono(&self) -> bool {
        true
    }

    fn process_stereo(
        &mut self,
        ctx: &ProcessorContext<'_>,
        in_l: &Block,
        in_r: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        _pitch: f32,
    ) {
        let shape = self.update(ctx);
        self.shape_block(shape, in_l, out_l);
        self.shape_block(shape, in_r, out_r);
    }

    fn process_mono(
        &mut self,
        ctx: &ProcessorContext<'_>,
        input: &Block,
        out_l: &mut Block,
        _out_r: &mut Block,
        _pitch: f32,
    ) {
        let shape = self.update(ctx);
        self.shape_block(shape, input, out_l);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::tables::Tables;

    #[test]
    fn test_soft_clip_shape() {
        assert!((soft_clip(0.1) - 0.0909).abs() < 1e-3);
        assert!(soft_clip(10.0) > 0.9 && soft_clip(10.0) < 1.0);
    }

    #[test]
    fn test_fold_reflects() {
        assert!((fold(0.3) - 0.3).abs() < 1e-6);
        assert!((fold(1.4) - 0.6).abs() < 1e-6);
        assert!((fold(-1.4) + 0.6).abs() < 1e-6);
        assert!((fold(3.5) + 0.5).abs() < 1e-6);
        assert_eq!(fold(f32::NAN), 0.0);
    }

    #[test]
    fn test_hard_clip_bounds_output() {
        let tables = Tables::new();
        let fp = [24.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let ip = [1, 0, 0, 0];
        let ctx = ProcessorContext {
            sample_rate: 48_000.0,
            sample_rate_inv: 1.0 / 48_000.0,
            tables: &tables,
            float_params: &fp,
            int_params: &ip,
        };
        let mut shaper = Waveshaper::new();
        let input = [0.5; BLOCK_SIZE];
        let mut out = [0.0; BLOCK_SIZE];
        let mut unused = [0.0; BLOCK_SIZE];
        shaper.process_mono(&ctx, &input, &mut out, &mut unused, 0.0);
        assert!(out.iter().all(|&x| (x - 1.0).abs() < 1e-6));
    }
}
