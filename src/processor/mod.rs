//! Per-zone and per-bus audio processors.
//!
//! A zone stores up to `PROCESSORS_PER_ZONE` [`ProcessorStorage`] slots. When a
//! voice starts it spawns a live [`Processor`] for each active slot, and the
//! voice chain then runs them in order, negotiating mono or stereo operation
//! as it goes:
//!
//! ```text
//!   mono signal ──┬─ processor can run mono,  stays mono  ──→ mono
//!                 ├─ processor can run mono,  makes stereo ──→ stereo
//!                 └─ processor needs stereo: copy L to R   ──→ stereo
//!   stereo signal ── always processed as stereo            ──→ stereo
//! ```

pub mod micro_delay;
pub mod osc_sin;
pub mod super_svf;
pub mod waveshaper;
pub mod width;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::tables::Tables;
use crate::engine::memory_pool::MemoryPool;
use crate::BLOCK_SIZE;

pub use micro_delay::MicroDelay;
pub use osc_sin::OscSin;
pub use super_svf::SuperSvfProcessor;
pub use waveshaper::Waveshaper;
pub use width::StereoWidth;

pub const MAX_PROCESSOR_FLOAT_PARAMS: usize = 9;
pub const MAX_PROCESSOR_INT_PARAMS: usize = 4;

pub type Block = [f32; BLOCK_SIZE];

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessorType {
    #[default]
    None,
    SuperSvf,
    OscSin,
    Waveshaper,
    MicroDelay,
    StereoWidth,
}

impl ProcessorType {
    pub const ALL: [ProcessorType; 6] = [
        ProcessorType::None,
        ProcessorType::SuperSvf,
        ProcessorType::OscSin,
        ProcessorType::Waveshaper,
        ProcessorType::MicroDelay,
        ProcessorType::StereoWidth,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ProcessorType::None => "Off",
            ProcessorType::SuperSvf => "Super SVF",
            ProcessorType::OscSin => "OSC Sin",
            ProcessorType::Waveshaper => "Waveshaper",
            ProcessorType::MicroDelay => "Micro Delay",
            ProcessorType::StereoWidth => "Stereo Width",
        }
    }

    /// Default float and int parameters for a freshly chosen processor.
    pub fn default_params(
        self,
    ) -> (
        [f32; MAX_PROCESSOR_FLOAT_PARAMS],
        [i32; MAX_PROCESSOR_INT_PARAMS],
    ) {
        let mut fp = [0.0; MAX_PROCESSOR_FLOAT_PARAMS];
        let ip = [0; MAX_PROCESSOR_INT_PARAMS];
        match self {
            ProcessorType::None | ProcessorType::SuperSvf | ProcessorType::OscSin => {}
            ProcessorType::Waveshaper => fp[0] = 6.0,
            ProcessorType::MicroDelay => {
                fp[0] = 5.0;
                fp[1] = 11.0;
            }
            ProcessorType::StereoWidth => fp[0] = 1.0,
        }
        (fp, ip)
    }
}

/// Stored settings of one processor slot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorStorage {
    pub processor_type: ProcessorType,
    pub mix: f32,
    pub float_params: [f32; MAX_PROCESSOR_FLOAT_PARAMS],
    pub int_params: [i32; MAX_PROCESSOR_INT_PARAMS],
    pub is_active: bool,
}

impl Default for ProcessorStorage {
    fn default() -> Self {
        Self::new(ProcessorType::None)
    }
}

impl ProcessorStorage {
    pub fn new(processor_type: ProcessorType) -> Self {
        let (float_params, int_params) = processor_type.default_params();
        Self {
            processor_type,
            mix: 1.0,
            float_params,
            int_params,
            is_active: true,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.is_active && self.processor_type != ProcessorType::None
    }
}

/// Everything a processor reads while rendering a block.
pub struct ProcessorContext<'a> {
    pub sample_rate: f32,
    pub sample_rate_inv: f32,
    pub tables: &'a Tables,
    pub float_params: &'a [f32],
    pub int_params: &'a [i32],
}

impl ProcessorContext<'_> {
    #[inline]
    pub fn fp(&self, i: usize) -> f32 {
        self.float_params
            .get(i)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    #[inline]
    pub fn ip(&self, i: usize) -> i32 {
        self.int_params.get(i).copied().unwrap_or(0)
    }
}

pub trait ProcessorUnit {
    fn can_process_mono(&self) -> bool;

    fn mono_input_creates_stereo_output(&self) -> bool {
        false
    }

    fn process_stereo(
        &mut self,
        ctx: &ProcessorContext<'_>,
        in_l: &Block,
        in_r: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        pitch: f32,
    );

    /// Mono input. Mono-to-mono processors write only `out_l`.
    fn process_mono(
        &mut self,
        _ctx: &ProcessorContext<'_>,
        input: &Block,
        out_l: &mut Block,
        _out_r: &mut Block,
        _pitch: f32,
    ) {
        out_l.copy_from_slice(input);
    }

    /// Hand any pooled memory back before the processor is dropped.
    fn release_memory(&mut self, _pool: &mut MemoryPool) {}
}

pub enum Processor {
    SuperSvf(SuperSvfProcessor),
    OscSin(OscSin),
    Waveshaper(Waveshaper),
    MicroDelay(MicroDelay),
    StereoWidth(StereoWidth),
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $body:expr) => {
        match $self {
            Processor::SuperSvf($p) => $body,
            Processor::OscSin($p) => $body,
            Processor::Waveshaper($p) => $body,
            Processor::MicroDelay($p) => $body,
            Processor::StereoWidth($p) => $body,
        }
    };
}

impl Processor {
    /// Build the live processor for a storage slot. Returns `None` for an
    /// empty or inactive slot.
    pub fn spawn(
        storage: &ProcessorStorage,
        pool: &mut MemoryPool,
        sample_rate: f32,
    ) -> Option<Processor> {
        if !storage.is_engaged() {
            return None;
        }
        Some(match storage.processor_type {
            ProcessorType::None => return None,
            ProcessorType::SuperSvf => Processor::SuperSvf(SuperSvfProcessor::new()),
            ProcessorType::OscSin => Processor::OscSin(OscSin::new()),
            ProcessorType::Waveshaper => Processor::Waveshaper(Waveshaper::new()),
            ProcessorType::MicroDelay => Processor::MicroDelay(MicroDelay::new(pool, sample_rate)),
            ProcessorType::StereoWidth => Processor::StereoWidth(StereoWidth::new()),
        })
    }

    pub fn processor_type(&self) -> ProcessorType {
        match self {
            Processor::SuperSvf(_) => ProcessorType::SuperSvf,
            Processor::OscSin(_) => ProcessorType::OscSin,
            Processor::Waveshaper(_) => ProcessorType::Waveshaper,
            Processor::MicroDelay(_) => ProcessorType::MicroDelay,
            Processor::StereoWidth(_) => ProcessorType::StereoWidth,
        }
    }

    pub fn can_process_mono(&self) -> bool {
        dispatch!(self, p => p.can_process_mono())
    }

    pub fn mono_input_creates_stereo_output(&self) -> bool {
        dispatch!(self, p => p.mono_input_creates_stereo_output())
    }

    pub fn process_stereo(
        &mut self,
        ctx: &ProcessorContext<'_>,
        in_l: &Block,
        in_r: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        pitch: f32,
    ) {
        dispatch!(self, p => p.process_stereo(ctx, in_l, in_r, out_l, out_r, pitch))
    }

    pub fn process_mono(
        &mut self,
        ctx: &ProcessorContext<'_>,
        input: &Block,
        out_l: &mut Block,
        out_r: &mut Block,
        pitch: f32,
    ) {
        dispatch!(self, p => p.process_mono(ctx, input, out_l, out_r, pitch))
    }

    pub fn release_memory(&mut self, pool: &mut MemoryPool) {
        dispatch!(self, p => p.release_memory(pool))
    }
}
