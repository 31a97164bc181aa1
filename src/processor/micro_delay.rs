//! Short stereo delay that turns a mono input into a stereo one.
//!
//! | param  | meaning                    |
//! | ------ | -------------------------- |
//! | fp[0]  | left delay in ms           |
//! | fp[1]  | right delay in ms          |
//! | fp[2]  | feedback, 0..0.95          |
//!
//! Delay memory comes from the engine's [`MemoryPool`]. If the pool is empty
//! the processor passes its input through unchanged.

use super::{Block, ProcessorContext, ProcessorUnit};
use crate::engine::memory_pool::{MemoryPool, PoolBlock};

pub struct MicroDelay {
    lines: [Option<PoolBlock>; 2],
    write_pos: usize,
}

impl MicroDelay {
    pub fn new(pool: &mut MemoryPool, _sample_rate: f32) -> Self {
        let left = pool.checkout_block();
        let right = match left {
            Some(_) => pool.checkout_block(),
            None => None,
        };
        // both lines or neither
        let lines = match (left, right) {
            (Some(l), Some(r)) => [Some(l), Some(r)],
            (Some(l), None) => {
                pool.return_block(l);
                [None, None]
            }
            _ => [None, None],
        };
        Self {
            lines,
            write_pos: 0,
        }
    }

    pub fn has_memory(&self) -> bool {
        self.lines.iter().all(|l| l.is_some())
    }

    fn delay_samples(ms: f32, sample_rate: f32, len: usize) -> usize {
        let samples = (ms.clamp(0.0, 1_000.0) * 0.001 * sample_rate) as usize;
        samples.clamp(1, len.saturating_sub(1).max(1))
    }

    fn run(
        &mut self,
        ctx: &ProcessorContext<'_>,
        in_l: &Block,
        in_r: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
    ) {
        let [Some(line_l), Some(line_r)] = &mut self.lines else {
            out_l.copy_from_slice(in_l);
            out_r.copy_from_slice(in_r);
            return;
        };
        let len = line_l.len().min(line_r.len());
        let delay_l = Self::delay_samples(ctx.fp(0), ctx.sample_rate, len);
        let delay_r = Self::delay_samples(ctx.fp(1), ctx.sample_rate, len);
        let feedback = ctx.fp(2).clamp(0.0, 0.95);
        let buf_l = line_l.as_mut_slice();
        let buf_r = line_r.as_mut_slice();

        let mut w = self.write_pos % len;
        for i in 0..in_l.len() {
            let rl = buf_l[(w + len - delay_l) % len];
            let rr = buf_r[(w + len - delay_r) % len];
            buf_l[w] = in_l[i] + rl * feedback;
            buf_r[w] = in_r[i] + rr * feedback;
            out_l[i] = rl;
            out_r[i] = rr;
            w = (w + 1) % len;
        }
        self.write_pos = w;
    }
}

impl ProcessorUnit for MicroDelay {
    fn can_process_mono(&self) -> bool {
        true
    }

    fn mono_input_creates_stereo_output(&self) -> bool {
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
        self.run(ctx, in_l, in_r, out_l, out_r);
    }

    fn process_mono(
        &mut self,
        ctx: &ProcessorContext<'_>,
        input: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        _pitch: f32,
    ) {
        self.run(ctx, input, input, out_l, out_r);
    }

    fn release_memory(&mut self, pool: &mut MemoryPool) {
        for line in self.lines.iter_mut() {
            if let Some(block) = line.take() {
                pool.return_block(block);
            }
        }
    }
}
