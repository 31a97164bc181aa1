//! Gain stages.

/*
Amplitude
=========

Amplification is multiplication. Every gain stage in a voice is one of two
shapes:

  scalar     one number for the whole block (bus trims, fixed gains)

  envelope   one number per sample, precomputed into a block-sized cache
             (the amplitude envelope output)

Amplitude Taper
---------------

User-facing amplitude controls are cubed before use:

    gain = amp³

    amp   0.0   0.5    0.79   1.0   1.26
    gain  0.0   0.125  0.5    1.0   2.0
    dB    -inf  -18    -6     0     +6

A cubic taper spreads the useful range of the control over more of its travel
than a linear one while keeping 1.0 at unity.
*/

use crate::BLOCK_SIZE;

/// `buffer[i] *= env[i]`
#[inline]
pub fn scale_by(env: &[f32; BLOCK_SIZE], buffer: &mut [f32; BLOCK_SIZE]) {
    for (s, e) in buffer.iter_mut().zip(env.iter()) {
        *s *= *e;
    }
}

/// `buffer[i] *= gain`
#[inline]
pub fn mul_block(buffer: &mut [f32], gain: f32) {
    for s in buffer.iter_mut() {
        *s *= gain;
    }
}

/// Cubic amplitude taper.
#[inline]
pub fn amp_to_gain(amp: f32) -> f32 {
    let amp = amp.max(0.0);
    amp * amp * amp
}

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_by_envelope() {
        let mut buffer = [2.0; BLOCK_SIZE];
        let mut env = [0.0; BLOCK_SIZE];
        for (i, e) in env.iter_mut().enumerate() {
            *e = i as f32 / BLOCK_SIZE as f32;
        }
        scale_by(&env, &mut buffer);
        assert_eq!(buffer[0], 0.0);
        assert!((buffer[8] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_amp_taper() {
        assert_eq!(amp_to_gain(1.0), 1.0);
        assert!((amp_to_gain(0.5) - 0.125).abs() < 1e-7);
        assert_eq!(amp_to_gain(-1.0), 0.0);
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-3);
    }
}
