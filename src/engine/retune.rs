//! MIDI key remapping and microtuning.

/// Maps incoming keys to the keys the engine plays, and adds a per-key
/// tuning offset in semitones. The default is identity with 12-TET.
#[derive(Debug, Clone)]
pub struct MidiKeyRetuner {
    key_map: [i16; 128],
    offsets: [f32; 128],
}

impl Default for MidiKeyRetuner {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiKeyRetuner {
    pub fn new() -> Self {
        Self {
            key_map: std::array::from_fn(|i| i as i16),
            offsets: [0.0; 128],
        }
    }

    #[inline]
    fn slot(key: i16) -> usize {
        key.clamp(0, 127) as usize
    }

    /// The key actually played for an incoming key.
    pub fn remap_key_to(&self, _channel: i16, key: i16) -> i16 {
        self.key_map[Self::slot(key)]
    }

    /// Tuning offset in semitones for a voice that was started by `original_key`.
    pub fn retune_remapped_key(&self, _channel: i16, _key: i16, original_key: i16) -> f32 {
        self.offsets[Self::slot(original_key)]
    }

    pub fn set_key_map(&mut self, from: i16, to: i16) {
        self.key_map[Self::slot(from)] = to.clamp(0, 127);
    }

    /// Install a scale given as cents offsets from 12-TET, repeating every `cents.len()` keys.
    pub fn set_scale_cents(&mut self, cents: &[f32]) {
        if cents.is_empty() {
            self.offsets = [0.0; 128];
            return;
        }
        for (key, offset) in self.offsets.iter_mut().enumerate() {
            let c = cents[key % cents.len()];
            *offset = if c.is_finite() { c / 100.0 } else { 0.0 };
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_default() {
        let retuner = MidiKeyRetuner::new();
        assert_eq!(retuner.remap_key_to(0, 60), 60);
        assert_eq!(retuner.retune_remapped_key(0, 60, 60), 0.0);
        assert_eq!(retuner.remap_key_to(0, 500), 127);
    }

    #[test]
    fn test_scale_and_map() {
        let mut retuner = MidiKeyRetuner::new();
        retuner.set_scale_cents(&[0.0, -50.0]);
        retuner.set_key_map(61, 48);
        assert_eq!(retuner.remap_key_to(0, 61), 48);
        assert_eq!(retuner.retune_remapped_key(0, 48, 61), -0.5);
        assert_eq!(retuner.retune_remapped_key(0, 60, 60), 0.0);
    }
}
