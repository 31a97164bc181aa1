use crate::{BLOCK_SIZE, BLOCK_SIZE_INV};

/*
Block Interpolation
===================

Control values (amplitudes, pans, processor mix) only change once per block.
Jumping to a new value on a block boundary clicks, so every consumer of a
control value ramps it linearly across the block instead.

Vocabulary
----------

  current   The value at the start of the block (where the last block ended).

  target    The value at the end of the block.

  ramp      Sample i of the block sees

              current + (target - current) * (i + 1) / BLOCK_SIZE

            so the last sample lands exactly on `target`.


Usage Pattern
-------------

Call `set_target` once per block, then any number of block operations. All
operations in the same block see the same ramp:

    interp.set_target(new_amp);        // current <- old target
    interp.multiply_block(&mut left);
    interp.multiply_block(&mut right); // same ramp as left

`set_target_instant` snaps both ends, used when a voice starts so the first
block does not fade in from zero.

When `current == target` every sample of the ramp is exactly `target`, so a
steady unity gain passes samples through bit-for-bit.
*/

#[derive(Debug, Clone, Copy)]
pub struct BlockInterpolator {
    current: f32,
    target: f32,
}

impl Default for BlockInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockInterpolator {
    pub const fn new() -> Self {
        Self {
            current: 0.0,
            target: 0.0,
        }
    }

    /// Start a new ramp from the previous target to `target`.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.current = self.target;
        self.target = target;
    }

    /// Jump straight to `target` with no ramp.
    #[inline]
    pub fn set_target_instant(&mut self, target: f32) {
        self.current = target;
        self.target = target;
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    fn value_at(&self, i: usize) -> f32 {
        if self.current == self.target {
            self.target
        } else {
            let dy = (self.target - self.current) * BLOCK_SIZE_INV;
            self.current + dy * (i + 1) as f32
        }
    }

    /// `buffer[i] *= ramp[i]`
    pub fn multiply_block(&self, buffer: &mut [f32; BLOCK_SIZE]) {
        for (i, s) in buffer.iter_mut().enumerate() {
            *s *= self.value_at(i);
        }
    }

    /// Multiply both channels by the same ramp.
    pub fn multiply_2_blocks(&self, left: &mut [f32; BLOCK_SIZE], right: &mut [f32; BLOCK_SIZE]) {
        for i in 0..BLOCK_SIZE {
            let v = self.value_at(i);
            left[i] *= v;
            right[i] *= v;
        }
    }

    /// Crossfade: `out = dry * (1 - ramp) + wet * ramp`.
    pub fn fade_blocks(
        &self,
        dry: &[f32; BLOCK_SIZE],
        wet: &[f32; BLOCK_SIZE],
        out: &mut [f32; BLOCK_SIZE],
    ) {
        for i in 0..BLOCK_SIZE {
            let v = self.value_at(i);
            out[i] = dry[i] * (1.0 - v) + wet[i] * v;
        }
    }

    /// Write the ramp itself into `out`.
    pub fn store_block(&self, out: &mut [f32; BLOCK_SIZE]) {
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.value_at(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_lands_on_target() {
        let mut interp = BlockInterpolator::new();
        interp.set_target_instant(0.0);
        interp.set_target(1.0);
        let mut out = [0.0; BLOCK_SIZE];
        interp.store_block(&mut out);
        assert!((out[BLOCK_SIZE - 1] - 1.0).abs() < 1e-6);
        assert!((out[0] - BLOCK_SIZE_INV).abs() < 1e-6);
        for w in out.windows(2) {
            assert!(w[1] > w[0], "ramp should be monotonic");
        }
    }

    #[test]
    fn test_steady_unity_is_exact() {
        let mut interp = BlockInterpolator::new();
        interp.set_target_instant(1.0);
        interp.set_target(1.0);
        let mut buffer = [0.0; BLOCK_SIZE];
        for (i, s) in buffer.iter_mut().enumerate() {
            *s = (i as f32 * 0.37).sin();
        }
        let expected = buffer;
        interp.multiply_block(&mut buffer);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn test_fade_endpoints() {
        let dry = [1.0; BLOCK_SIZE];
        let wet = [-1.0; BLOCK_SIZE];
        let mut out = [0.0; BLOCK_SIZE];

        let mut interp = BlockInterpolator::new();
        interp.set_target_instant(0.0);
        interp.fade_blocks(&dry, &wet, &mut out);
        assert!(out.iter().all(|&s| s == 1.0));

        interp.set_target_instant(1.0);
        interp.fade_blocks(&dry, &wet, &mut out);
        assert!(out.iter().all(|&s| s == -1.0));
    }

    #[test]
    fn test_set_target_chains_blocks() {
        let mut interp = BlockInterpolator::new();
        interp.set_target_instant(0.5);
        interp.set_target(1.0);
        interp.set_target(0.0);
        let mut out = [0.0; BLOCK_SIZE];
        interp.store_block(&mut out);
        // second ramp starts where the first ended
        assert!(out[0] < 1.0 && out[0] > 0.9);
        assert!(out[BLOCK_SIZE - 1].abs() < 1e-6);
    }
}
