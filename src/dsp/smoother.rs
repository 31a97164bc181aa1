/// Number of blocks a controller change is spread over.
pub const SMOOTH_BLOCKS: u32 = 8;

/// Block-rate linear smoother for incoming controller values (pitch bend, CCs).
///
/// A new target starts moving on the next call to [`BlockSmoother::process`]
/// and arrives after [`SMOOTH_BLOCKS`] blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockSmoother {
    pub output: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl BlockSmoother {
    pub fn set_target(&mut self, target: f32) {
        if !target.is_finite() {
            return;
        }
        self.target = target;
        self.step = (target - self.output) / SMOOTH_BLOCKS as f32;
        self.remaining = SMOOTH_BLOCKS;
    }

    pub fn set_instant(&mut self, value: f32) {
        self.output = value;
        self.target = value;
        self.remaining = 0;
    }

    /// Advance by one block.
    pub fn process(&mut self) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        self.output = if self.remaining == 0 {
            self.target
        } else {
            self.output + self.step
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoother_arrives_after_smooth_blocks() {
        let mut s = BlockSmoother::default();
        s.set_target(1.0);
        assert_eq!(s.output, 0.0, "nothing moves until the next block");
        for _ in 0..SMOOTH_BLOCKS - 1 {
            s.process();
            assert!(s.output > 0.0 && s.output < 1.0);
        }
        s.process();
        assert_eq!(s.output, 1.0);
    }

    #[test]
    fn test_smoother_ignores_nan() {
        let mut s = BlockSmoother::default();
        s.set_instant(0.5);
        s.set_target(f32::NAN);
        s.process();
        assert_eq!(s.output, 0.5);
    }
}
