//! Benchmarks for the AHDSR envelope.

use std::hint::black_box;

use criterion::Criterion;
use saavy_sampler::dsp::envelope::{AdsrStorage, Envelope};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let params = AdsrStorage {
        a: 0.3,
        d: 0.4,
        s: 0.6,
        a_shape: 0.5,
        d_shape: -0.5,
        ..AdsrStorage::default()
    };

    let mut env = Envelope::new(48_000.0);
    env.attack_from(0.0);
    group.bench_function("gated", |b| {
        b.iter(|| env.process_block(black_box(&params), true))
    });

    let mut env = Envelope::new(48_000.0);
    env.attack_from(0.0);
    group.bench_function("released", |b| {
        b.iter(|| {
            env.process_block(black_box(&params), false);
            if env.is_complete() {
                env.attack_from(0.0);
            }
        })
    });

    group.finish();
}
