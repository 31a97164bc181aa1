//! Benchmarks for low-level DSP primitives.

mod envelope;
mod filter;
mod generator;
mod halfband;

pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use generator::bench_generator;
pub use halfband::bench_halfband;
