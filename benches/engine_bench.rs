//! Benchmarks for DSP primitives and whole-engine scenarios.
//!
//! Run with: cargo bench
//!
//! The engine renders fixed 16-sample blocks. At 48kHz one block is a
//! 0.33ms deadline, so a full engine block with every voice busy has to
//! stay well under that.
//!
//! Benchmark groups:
//!   - dsp/*        Generator, filter, envelope, decimator
//!   - scenarios/*  Engine blocks with N voices playing

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Voice counts used by the engine scenarios.
pub const VOICE_COUNTS: &[usize] = &[1, 8, 32, 64];

criterion_group!(
    benches,
    dsp::bench_generator,
    dsp::bench_filter,
    dsp::bench_envelope,
    dsp::bench_halfband,
    scenarios::bench_engine,
);
criterion_main!(benches);
