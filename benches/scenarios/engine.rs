//! One engine block with a given number of voices sounding.
//!
//! Voices play a long looping sample through a filter so none of them
//! finish during measurement.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_sampler::engine::group::Group;
use saavy_sampler::engine::zone::Zone;
use saavy_sampler::processor::{ProcessorStorage, ProcessorType};
use saavy_sampler::sample::{Sample, SampleManager, SampleMeta};
use saavy_sampler::{Engine, EngineConfig};

use crate::VOICE_COUNTS;

fn loaded_engine(with_filter: bool) -> Engine {
    let (mut engine, _controller) = Engine::new(EngineConfig::default());
    let mut manager = SampleManager::new();
    let wave: Vec<f32> = (0..96_000).map(|i| (i as f32 * 0.02).sin() * 0.2).collect();
    let sample = Sample::from_f32("pad", 48_000.0, vec![wave.clone(), wave])
        .unwrap()
        .with_meta(SampleMeta {
            loop_points: Some((1_000, 95_000)),
            ..SampleMeta::default()
        });
    let id = manager.add_sample(sample);

    let mut zone = Zone::with_sample(id);
    zone.attach_to_sample(&manager, 0);
    if with_filter {
        zone.processor_storage[0] = ProcessorStorage::new(ProcessorType::SuperSvf);
    }
    let part = engine.patch_mut().part_mut(0).unwrap();
    let g = part.add_group(Box::new(Group::new("bench")));
    part.group_mut(g).unwrap().add_zone(Box::new(zone));
    engine
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &voices in VOICE_COUNTS {
        for (name, with_filter) in [("dry", false), ("filtered", true)] {
            let mut engine = loaded_engine(with_filter);
            for i in 0..voices {
                // Spread keys so some voices oversample.
                engine.note_on(0, 36 + (i % 60) as i16, i as i32, 100);
            }
            group.bench_with_input(BenchmarkId::new(name, voices), &voices, |b, _| {
                b.iter(|| {
                    engine.process_audio();
                    black_box(engine.output());
                })
            });
        }
    }

    group.finish();
}
