//! Pan laws.
//!
//! A pan position `p` in `[-1, 1]` is mapped to `pv = (p + 1) / 2` in `[0, 1]`
//! and then to a 2x2 matrix:
//!
//! ```text
//!   out_l = m[0] * in_l + m[2] * in_r
//!   out_r = m[1] * in_r + m[3] * in_l
//! ```
//!
//! For a mono input only `m[0]` (left) and `m[3]` (right) are used.

use std::f32::consts::FRAC_PI_2;

use crate::BLOCK_SIZE;

pub type PanMatrix = [f32; 4];

#[inline]
fn pan_value(pan: f32) -> f32 {
    (pan.clamp(-1.0, 1.0) + 1.0) * 0.5
}

/// Mono source into stereo. Hard left and hard right are unity on one side.
/// Centre is `1/√2` on both.
pub fn mono_equal_power(pan: f32) -> PanMatrix {
    let t = pan_value(pan) * FRAC_PI_2;
    [t.cos(), 0.0, 0.0, t.sin()]
}

/// Stereo balance. Centre is the identity. Panning one way fades the far
/// channel out while folding it into the near one.
pub fn stereo_equal_power(pan: f32) -> PanMatrix {
    let pv = pan_value(pan);
    if pv < 0.5 {
        let t = pv * 2.0 * FRAC_PI_2;
        [1.0, t.sin(), t.cos(), 0.0]
    } else {
        let t = (pv - 0.5) * 2.0 * FRAC_PI_2;
        [t.cos(), 1.0, 0.0, t.sin()]
    }
}

/// Pan a mono block held in `left` out to both channels.
pub fn pan_mono_block(pan: f32, left: &mut [f32; BLOCK_SIZE], right: &mut [f32; BLOCK_SIZE]) {
    let m = mono_equal_power(pan);
    for i in 0..BLOCK_SIZE {
        let x = left[i];
        left[i] = m[0] * x;
        right[i] = m[3] * x;
    }
}

pub fn pan_stereo_block(pan: f32, left: &mut [f32; BLOCK_SIZE], right: &mut [f32; BLOCK_SIZE]) {
    let m = stereo_equal_power(pan);
    for i in 0..BLOCK_SIZE {
        let il = left[i];
        let ir = right[i];
        left[i] = m[0] * il + m[2] * ir;
        right[i] = m[1] * ir + m[3] * il;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    #[test]
    fn test_mono_centre_is_root_two() {
        let m = mono_equal_power(0.0);
        assert!((m[0] - FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((m[3] - FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_mono_extremes_are_unity() {
        let left = mono_equal_power(-1.0);
        assert!((left[0] - 1.0).abs() < 1e-6 && left[3].abs() < 1e-6);
        let right = mono_equal_power(1.0);
        assert!(right[0].abs() < 1e-6 && (right[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_centre_is_identity() {
        let m = stereo_equal_power(0.0);
        assert_eq!(m, [1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stereo_hard_left_folds_right_in() {
        let mut l = [0.5; BLOCK_SIZE];
        let mut r = [0.25; BLOCK_SIZE];
        pan_stereo_block(-1.0, &mut l, &mut r);
        assert!((l[0] - 0.75).abs() < 1e-6);
        assert!(r[0].abs() < 1e-6);
    }

    #[test]
    fn test_pan_clamps_out_of_range() {
        assert_eq!(mono_equal_power(5.0), mono_equal_power(1.0));
    }
}
