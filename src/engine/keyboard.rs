#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardRange {
    pub key_start: i16,
    pub key_end: i16,
}

impl Default for KeyboardRange {
    fn default() -> Self {
        Self {
            key_start: 0,
            key_end: 127,
        }
    }
}

impl KeyboardRange {
    pub fn new(key_start: i16, key_end: i16) -> Self {
        Self { key_start, key_end }
    }

    pub fn includes(&self, key: i16) -> bool {
        key >= self.key_start && key <= self.key_end
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityRange {
    pub velocity_start: i16,
    pub velocity_end: i16,
}

impl Default for VelocityRange {
    fn default() -> Self {
        Self {
            velocity_start: 0,
            velocity_end: 127,
        }
    }
}

impl VelocityRange {
    pub fn new(velocity_start: i16, velocity_end: i16) -> Self {
        Self {
            velocity_start,
            velocity_end,
        }
    }

    pub fn includes(&self, velocity: i16) -> bool {
        velocity >= self.velocity_start && velocity <= self.velocity_end
    }
}
