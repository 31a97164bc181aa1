//! The patch: every part and the busses they mix into.

use crate::dsp::tables::Tables;
use crate::engine::bus::{BusContext, Busses};
use crate::engine::memory_pool::MemoryPool;
use crate::engine::part::Part;
use crate::engine::retune::MidiKeyRetuner;
use crate::voice::{Voice, VoiceContext};
use crate::NUM_PARTS;

pub struct Patch {
    pub parts: [Part; NUM_PARTS],
    pub busses: Busses,
}

impl Default for Patch {
    fn default() -> Self {
        Self::new()
    }
}

impl Patch {
    pub fn new() -> Self {
        Self {
            parts: std::array::from_fn(Part::new),
            busses: Busses::new(),
        }
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn part_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for part in &mut self.parts {
            part.set_sample_rate(sample_rate);
        }
    }

    /// Render every part into the busses and mix the busses down to main.
    pub(crate) fn process(
        &mut self,
        voices: &mut [Option<Voice>],
        pool: &mut MemoryPool,
        tables: &Tables,
        retuner: &MidiKeyRetuner,
        sample_rate: f32,
    ) {
        self.busses.clear();
        for part in &mut self.parts {
            part.controllers.process();
            let vctx = VoiceContext {
                tables,
                retuner,
                sample_rate,
                pitch_bend: part.controllers.pitch_bend.output,
                mod_wheel: part.controllers.mod_wheel(),
            };
            part.process(voices, pool, &vctx, &mut self.busses);
        }
        self.busses.mix_down(&BusContext {
            sample_rate,
            tables,
        });
    }
}
