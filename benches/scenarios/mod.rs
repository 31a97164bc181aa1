//! Whole-engine scenario benchmarks.

mod engine;

pub use engine::bench_engine;
