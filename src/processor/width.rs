//! Stereo width. Only meaningful on a stereo signal, so it asks the voice to
//! promote mono input before it runs.
//!
//! fp[0] is the width: 0 collapses to mono, 1 is unchanged, 2 doubles the side signal.

use super::{Block, ProcessorContext, ProcessorUnit};
use crate::dsp::lipol::BlockInterpolator;
use crate::BLOCK_SIZE;

pub struct StereoWidth {
    width: BlockInterpolator,
    first_block: bool,
}

impl StereoWidth {
    pub fn new() -> Self {
        Self {
            width: BlockInterpolator::new(),
            first_block: true,
        }
    }
}

impl Default for StereoWidth {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorUnit for StereoWidth {
    fn can_process_mono(&self) -> bool {
        false
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
        let width = ctx.fp(0).clamp(0.0, 2.0);
        if self.first_block {
            self.width.set_target_instant(width);
            self.first_block = false;
        } else {
            self.width.set_target(width);
        }
        let mut w = [0.0; BLOCK_SIZE];
        self.width.store_block(&mut w);
        for i in 0..BLOCK_SIZE {
            let mid = 0.5 * (in_l[i] + in_r[i]);
            let side = 0.5 * (in_l[i] - in_r[i]) * w[i];
            out_l[i] = mid + side;
            out_r[i] = mid - side;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::tables::Tables;

    #[test]
    fn test_zero_width_is_mono_and_unity_is_identity() {
        let tables = Tables::new();
        let mut l = [0.0; BLOCK_SIZE];
        let mut r = [0.0; BLOCK_SIZE];
        for i in 0..BLOCK_SIZE {
            l[i] = i as f32 * 0.1;
            r[i] = -(i as f32) * 0.05;
        }
        let run = |width: f32| {
            let fp = [width];
            let ctx = ProcessorContext {
                sample_rate: 48_000.0,
                sample_rate_inv: 1.0 / 48_000.0,
                tables: &tables,
                float_params: &fp,
                int_params: &[],
            };
            let mut proc = StereoWidth::new();
            let mut ol = [0.0; BLOCK_SIZE];
            let mut or = [0.0; BLOCK_SIZE];
            proc.process_stereo(&ctx, &l, &r, &mut ol, &mut or, 0.0);
            (ol, or)
        };
        let (ol, or) = run(0.0);
        assert_eq!(ol, or);
        let (ol, or) = run(1.0);
        for i in 0..BLOCK_SIZE {
            assert!((ol[i] - l[i]).abs() < 1e-6 && (or[i] - r[i]).abs() < 1e-6);
        }
    }
}
