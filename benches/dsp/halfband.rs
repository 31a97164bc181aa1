//! Benchmarks for the 2:1 decimator used by oversampled voices.

use std::hint::black_box;

use criterion::Criterion;
use saavy_sampler::dsp::halfband::HalfRateDecimator;
use saavy_sampler::BLOCK_SIZE_OS;

pub fn bench_halfband(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/halfband");
    let input: Vec<f32> = (0..BLOCK_SIZE_OS).map(|i| (i as f32 * 0.3).sin()).collect();
    let mut left = input.clone();
    let mut right = input.clone();

    for (name, mut hb) in [
        ("steep", HalfRateDecimator::steep()),
        ("light", HalfRateDecimator::light()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                hb.process_block_d2(black_box(&mut left), black_box(&mut right), BLOCK_SIZE_OS);
            })
        });
    }

    group.finish();
}
