//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_sampler::dsp::filter::{SuperSvf, SvfMode};
use saavy_sampler::dsp::tables::EqualTuning;
use saavy_sampler::BLOCK_SIZE;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let tuning = EqualTuning::new();
    let input: [f32; BLOCK_SIZE] =
        std::array::from_fn(|i| (i as f32 / BLOCK_SIZE as f32) * 2.0 - 1.0);
    let mut out_l = [0.0f32; BLOCK_SIZE];
    let mut out_r = [0.0f32; BLOCK_SIZE];

    for (name, mode) in [
        ("lowpass", SvfMode::LowPass),
        ("bandpass", SvfMode::BandPass),
        ("highpass", SvfMode::HighPass),
    ] {
        for four_pole in [false, true] {
            let mut svf = SuperSvf::new();
            let poles = if four_pole { "4pole" } else { "2pole" };
            group.bench_with_input(BenchmarkId::new(name, poles), &four_pole, |b, _| {
                b.iter(|| {
                    svf.calc_coeffs(0.0, 0.5, four_pole, 1.0 / 48_000.0, &tuning);
                    svf.process_block(
                        black_box(&input),
                        Some(&input),
                        mode,
                        four_pole,
                        &mut out_l,
                        &mut out_r,
                    );
                })
            });
        }
    }

    group.finish();
}
