//! Benchmarks for the sample generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_sampler::dsp::tables::Tables;
use saavy_sampler::generator::{resolve_generator, GeneratorOutput, GeneratorState};
use saavy_sampler::sample::Sample;
use saavy_sampler::BLOCK_SIZE;

const LEN: usize = 48_000;

fn looping_state(ratio: i32) -> GeneratorState {
    GeneratorState {
        is_finished: false,
        ratio,
        playback_upper_bound: LEN as i32,
        loop_upper_bound: LEN as i32,
        block_size: BLOCK_SIZE,
        ..GeneratorState::default()
    }
}

pub fn bench_generator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/generator");
    let tables = Tables::new();
    let wave: Vec<f32> = (0..LEN).map(|i| (i as f32 * 0.01).sin()).collect();
    let mono = Sample::from_f32("mono", 48_000.0, vec![wave.clone()]).unwrap();
    let stereo = Sample::from_f32("stereo", 48_000.0, vec![wave.clone(), wave]).unwrap();
    let mut out: GeneratorOutput = [[0.0; saavy_sampler::BLOCK_SIZE_OS]; 2];

    // Unity rate hits the exact-impulse row; a detuned rate exercises every tap.
    for (label, ratio) in [("unity", 1 << 24), ("detuned", 17_000_000)] {
        for (name, sample) in [("mono", &mono), ("stereo", &stereo)] {
            let generate =
                resolve_generator(sample.is_stereo(), sample.bit_depth(), true, true, false);
            let mut gd = looping_state(ratio);
            group.bench_with_input(BenchmarkId::new(name, label), &ratio, |b, _| {
                b.iter(|| generate(black_box(&mut gd), &tables, sample, black_box(&mut out)))
            });
        }
    }

    group.finish();
}
