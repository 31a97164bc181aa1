/*
Half-Rate Decimation
====================

Voices that play a sample far above its root pitch run their generator at
twice the engine rate and then come back down with this filter. Dropping every
other sample without filtering first would fold everything above the new
Nyquist back into the audible band.

Structure
---------

The decimator is a polyphase pair of allpass chains. Each input pair
(x[2n], x[2n+1]) feeds one sample into each chain:

    x[2n+1] ──→ A(z) ──┐
                       (+) ── × 0.5 ──→ y[n]
    x[2n]   ──→ B(z) ──┘

Each chain is a cascade of first-order allpass sections:

    y = c * (x - y_prev) + x_prev

The two chains have near-identical magnitude (1.0) but phase responses that
agree below a quarter of the input rate and disagree by 180° above it, so
summing them passes the low band and cancels the high band.

Coefficients
------------

The steep 12-coefficient set has a very narrow transition band and is used by
the voice. The 4-coefficient set is cheaper and used inside the SuperSVF,
whose internal 2× rate already sits well above the audio band.
*/

const STEEP_A: [f32; 6] = [
    0.036_681_503,
    0.274_631_76,
    0.561_098_97,
    0.769_741_83,
    0.892_260_8,
    0.962_094_55,
];
const STEEP_B: [f32; 6] = [
    0.136_547_62,
    0.423_138_62,
    0.677_540_05,
    0.839_889_6,
    0.931_541_96,
    0.987_816_4,
];
const LIGHT_A: [f32; 2] = [0.079_866_43, 0.545_353_65];
const LIGHT_B: [f32; 2] = [0.283_829_34, 0.834_411_9];

const MAX_ORDER: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
struct AllpassSection {
    c: f32,
    x1: f32,
    y1: f32,
}

impl AllpassSection {
    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let y = self.c * (x - self.y1) + self.x1;
        self.x1 = x;
        self.y1 = y;
        y
    }
}

#[derive(Debug, Clone, Copy)]
struct AllpassChain {
    sections: [AllpassSection; MAX_ORDER],
    order: usize,
}

impl AllpassChain {
    fn new(coeffs: &[f32]) -> Self {
        let mut sections = [AllpassSection::default(); MAX_ORDER];
        for (s, &c) in sections.iter_mut().zip(coeffs.iter()) {
            s.c = c;
        }
        Self {
            sections,
            order: coeffs.len().min(MAX_ORDER),
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        self.sections[..self.order]
            .iter_mut()
            .fold(x, |acc, s| s.process(acc))
    }

    fn reset(&mut self) {
        for s in self.sections.iter_mut() {
            s.x1 = 0.0;
            s.y1 = 0.0;
        }
    }
}

/// Two-channel 2:1 decimator.
#[derive(Debug, Clone, Copy)]
pub struct HalfRateDecimator {
    a: [AllpassChain; 2],
    b: [AllpassChain; 2],
}

impl HalfRateDecimator {
    /// Twelve coefficients, steep transition.
    pub fn steep() -> Self {
        Self::with_coefficients(&STEEP_A, &STEEP_B)
    }

    /// Four coefficients.
    pub fn light() -> Self {
        Self::with_coefficients(&LIGHT_A, &LIGHT_B)
    }

    fn with_coefficients(a: &[f32], b: &[f32]) -> Self {
        Self {
            a: [AllpassChain::new(a), AllpassChain::new(a)],
            b: [AllpassChain::new(b), AllpassChain::new(b)],
        }
    }

    pub fn reset(&mut self) {
        for chain in self.a.iter_mut().chain(self.b.iter_mut()) {
            chain.reset();
        }
    }

    #[inline]
    fn decimate_channel(a: &mut AllpassChain, b: &mut AllpassChain, buf: &mut [f32], n_in: usize) {
        for n in 0..n_in / 2 {
            let even = buf[2 * n];
            let odd = buf[2 * n + 1];
            buf[n] = 0.5 * (a.process(odd) + b.process(even));
        }
    }

    /// Decimate `n_in` samples of each channel in place. The first `n_in / 2`
    /// samples of each buffer hold the result.
    pub fn process_block_d2(&mut self, left: &mut [f32], right: &mut [f32], n_in: usize) {
        let n_in = n_in.min(left.len()).min(right.len()) & !1;
        let [a0, a1] = &mut self.a;
        let [b0, b1] = &mut self.b;
        Self::decimate_channel(a0, b0, left, n_in);
        Self::decimate_channel(a1, b1, right, n_in);
    }

    /// Decimate one mono pair of samples.
    #[inline]
    pub fn process_pair(&mut self, even: f32, odd: f32) -> f32 {
        0.5 * (self.a[0].process(odd) + self.b[0].process(even))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn decimated_peak(freq_ratio: f32) -> f32 {
        // freq_ratio is relative to the input sample rate
        let mut dec = HalfRateDecimator::steep();
        let mut peak = 0.0f32;
        for block in 0..64 {
            let mut l = [0.0f32; 64];
            let mut r = [0.0f32; 64];
            for i in 0..64 {
                let n = (block * 64 + i) as f32;
                l[i] = (TAU * freq_ratio * n).sin();
                r[i] = l[i];
            }
            dec.process_block_d2(&mut l, &mut r, 64);
            if block > 8 {
                peak = l[..32].iter().fold(peak, |acc, &x| acc.max(x.abs()));
            }
        }
        peak
    }

    #[test]
    fn test_dc_passes_at_unity() {
        let mut dec = HalfRateDecimator::steep();
        let mut out = 0.0;
        for _ in 0..2_000 {
            out = dec.process_pair(1.0, 1.0);
        }
        assert!((out - 1.0).abs() < 1e-3, "dc gain {}", out);
    }

    #[test]
    fn test_passband_kept() {
        let peak = decimated_peak(0.05);
        assert!(peak > 0.95 && peak < 1.05, "passband peak {}", peak);
    }

    #[test]
    fn test_stopband_rejected() {
        let peak = decimated_peak(0.4);
        assert!(peak < 0.01, "stopband peak {}", peak);
    }

    #[test]
    fn test_light_dc_gain() {
        let mut dec = HalfRateDecimator::light();
        let mut out = 0.0;
        for _ in 0..2_000 {
            out = dec.process_pair(0.5, 0.5);
        }
        assert!((out - 0.5).abs() < 1e-3);
    }
}
