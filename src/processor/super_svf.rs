//! Zone processor wrapper around the SuperSVF filter core.
//!
//! | param  | meaning                                   |
//! | ------ | ----------------------------------------- |
//! | fp[0]  | cutoff in octaves relative to 440 Hz       |
//! | fp[1]  | resonance, 0..1                           |
//! | ip[0]  | mode: 0 low-pass, 1 band-pass, 2 high-pass |
//! | ip[1]  | 0 two-pole, 1 four-pole                   |

use super::{Block, ProcessorContext, ProcessorUnit};
use crate::dsp::filter::{SuperSvf, SvfMode};

pub struct SuperSvfProcessor {
    svf: SuperSvf,
}

impl SuperSvfProcessor {
    pub fn new() -> Self {
        Self {
            svf: SuperSvf::new(),
        }
    }

    fn prepare(&mut self, ctx: &ProcessorContext<'_>) -> (SvfMode, bool) {
        let four_pole = ctx.ip(1) != 0;
        self.svf.calc_coeffs(
            ctx.fp(0),
            ctx.fp(1),
            four_pole,
            ctx.sample_rate_inv,
            &ctx.tables.tuning,
        );
        (SvfMode::from_index(ctx.ip(0)), four_pole)
    }
}

impl Default for SuperSvfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorUnit for SuperSvfProcessor {
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
        let (mode, four_pole) = self.prepare(ctx);
        self.svf
            .process_block(in_l, Some(in_r), mode, four_pole, out_l, out_r);
    }

    fn process_mono(
        &mut self,
        ctx: &ProcessorContext<'_>,
        input: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        _pitch: f32,
    ) {
        let (mode, four_pole) = self.prepare(ctx);
        self.svf.process_block(input, None, mode, four_pole, out_l, out_r);
    }
}
