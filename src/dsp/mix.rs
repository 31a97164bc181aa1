//! Block summing and copying.

/*
Summing Busses
==============

Voices, zones, groups and busses all meet at one operation: ADD a block into
an accumulator. Nothing here attenuates, so sums can exceed ±1.0. Headroom is
the job of the amplitude stages upstream (sample amp, output amp, bus level).

    zone output  ┐
    zone output  ├─ accumulate ─→ group output ─ accumulate ─→ bus
    zone output  ┘

The accumulators are cleared once per block by their owner before anyone
adds into them.
*/

use crate::BLOCK_SIZE;

pub type StereoBlock = [[f32; BLOCK_SIZE]; 2];

/// `dst += src`
#[inline]
pub fn accumulate_from_to(src: &[f32; BLOCK_SIZE], dst: &mut [f32; BLOCK_SIZE]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d += *s;
    }
}

/// `dst += src * gain`
#[inline]
pub fn accumulate_scaled(src: &[f32; BLOCK_SIZE], gain: f32, dst: &mut [f32; BLOCK_SIZE]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d += *s * gain;
    }
}

/// Sum both channels of a stereo block into another.
#[inline]
pub fn accumulate_stereo(src: &StereoBlock, dst: &mut StereoBlock) {
    accumulate_from_to(&src[0], &mut dst[0]);
    accumulate_from_to(&src[1], &mut dst[1]);
}

#[inline]
pub fn copy_from_to(src: &[f32; BLOCK_SIZE], dst: &mut [f32; BLOCK_SIZE]) {
    dst.copy_from_slice(src);
}

#[inline]
pub fn clear_stereo(block: &mut StereoBlock) {
    block[0].fill(0.0);
    block[1].fill(0.0);
}

/// Peak absolute value of a block.
#[inline]
pub fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_adds() {
        let src = [0.25; BLOCK_SIZE];
        let mut dst = [0.5; BLOCK_SIZE];
        accumulate_from_to(&src, &mut dst);
        assert!(dst.iter().all(|&s| (s - 0.75).abs() < 1e-7));
    }

    #[test]
    fn test_accumulate_scaled() {
        let src = [1.0; BLOCK_SIZE];
        let mut dst = [0.0; BLOCK_SIZE];
        accumulate_scaled(&src, 0.3, &mut dst);
        accumulate_scaled(&src, 0.3, &mut dst);
        assert!(dst.iter().all(|&s| (s - 0.6).abs() < 1e-6));
    }

    #[test]
    fn test_peak_uses_magnitude() {
        let mut block = [0.1; BLOCK_SIZE];
        block[3] = -0.9;
        assert!((peak(&block) - 0.9).abs() < 1e-7);
    }
}
