//! Realtime playback and offline rendering

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{eyre, Result, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::{error, info};

use saavy_sampler::engine::keyboard::{KeyboardRange, VelocityRange};
use saavy_sampler::messaging::ClientMessage;
use saavy_sampler::{Engine, EngineConfig, MessageController, BLOCK_SIZE};

pub struct NoteSchedule {
    pub notes: Vec<i16>,
    pub step: f32,
    pub tail: f32,
    pub velocity: i16,
}

/// Portion of a step a note is held before its release.
const GATE: f32 = 0.8;

fn load_samples(controller: &mut MessageController, samples: &[PathBuf]) -> Result<()> {
    for path in samples {
        controller
            .load_sample_into(path, 0, 0, 60, KeyboardRange::default(), VelocityRange::default())
            .wrap_err_with(|| format!("failed to load {}", path.display()))?;
    }
    Ok(())
}

fn report(controller: &mut MessageController) {
    controller.process_audio_messages();
    for msg in controller.drain_client_messages() {
        match msg {
            ClientMessage::Error { title, message } => error!(%title, "{message}"),
            ClientMessage::VoiceCount(count) => info!(count, "voices"),
            ClientMessage::Structure(entries) => info!(entries = entries.len(), "structure updated"),
        }
    }
}

pub fn play(
    mut config: EngineConfig,
    samples: &[PathBuf],
    notes: &[i16],
    step: f32,
    repeat: usize,
) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let stream_config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    config.sample_rate = stream_config.sample_rate().0 as f32;
    let channels = stream_config.channels() as usize;
    info!(sample_rate = config.sample_rate, channels, "audio device opened");

    let (mut engine, mut controller) = Engine::new(config);
    load_samples(&mut controller, samples)?;

    let mut pos = BLOCK_SIZE;
    let stream = device.build_output_stream(
        &stream_config.into(),
        move |data: &mut [f32], _| {
            for frame in data.chunks_mut(channels) {
                if pos == BLOCK_SIZE {
                    engine.process_audio();
                    pos = 0;
                }
                let out = engine.output();
                let (l, r) = (out[0][pos], out[1][pos]);
                match frame {
                    [mono] => *mono = 0.5 * (l + r),
                    [a, b, rest @ ..] => {
                        *a = l;
                        *b = r;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
                pos += 1;
            }
        },
        |err| error!(%err, "audio stream error"),
        None,
    )?;
    stream.play()?;

    let held = Duration::from_secs_f32(step * GATE);
    let rest = Duration::from_secs_f32(step * (1.0 - GATE));
    for _ in 0..repeat {
        for &key in notes {
            controller.note_on(0, key, 100)?;
            std::thread::sleep(held);
            controller.note_off(0, key)?;
            std::thread::sleep(rest);
            report(&mut controller);
        }
    }
    std::thread::sleep(Duration::from_secs(1));
    controller.stop_audio_thread()?;
    std::thread::sleep(Duration::from_millis(50));
    report(&mut controller);
    Ok(())
}

/// Strongest frequency in `signal`, Hann windowed. Resolution is
/// `sample_rate / signal.len()`.
fn dominant_frequency(signal: &[f32], sample_rate: f32) -> f32 {
    let n = signal.len();
    if n < 2 {
        return 0.0;
    }
    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 - 0.5 * (std::f32::consts::TAU * i as f32 / n as f32).cos();
            Complex::new(s * w, 0.0)
        })
        .collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buffer);
    let bin = buffer[1..n / 2]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm_sqr().total_cmp(&b.1.norm_sqr()))
        .map_or(0, |(i, _)| i + 1);
    bin as f32 * sample_rate / n as f32
}

pub fn render(
    config: EngineConfig,
    samples: &[PathBuf],
    schedule: &NoteSchedule,
    output: &Path,
    analyze: bool,
) -> Result<()> {
    let (mut engine, mut controller) = Engine::new(config);
    load_samples(&mut controller, samples)?;

    let sample_rate = engine.sample_rate();
    let blocks_per_step = ((schedule.step * sample_rate) / BLOCK_SIZE as f32).max(1.0) as usize;
    let gate_blocks = ((blocks_per_step as f32 * GATE) as usize).max(1);
    let tail_blocks = ((schedule.tail * sample_rate) / BLOCK_SIZE as f32) as usize;
    let total_blocks = blocks_per_step * schedule.notes.len() + tail_blocks;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)
        .wrap_err_with(|| format!("failed to create {}", output.display()))?;

    let mut note_audio = Vec::with_capacity(gate_blocks * BLOCK_SIZE);
    for block in 0..total_blocks {
        let index = block / blocks_per_step;
        if let Some(&key) = schedule.notes.get(index) {
            match block % blocks_per_step {
                0 => controller.note_on(0, key, schedule.velocity)?,
                b if b == gate_blocks => controller.note_off(0, key)?,
                _ => {}
            }
        }
        engine.process_audio();
        let out = engine.output();
        for i in 0..BLOCK_SIZE {
            writer.write_sample(out[0][i])?;
            writer.write_sample(out[1][i])?;
        }
        report(&mut controller);

        if analyze {
            if let Some(&key) = schedule.notes.get(index) {
                // Skip the attack and listen until the release.
                let b = block % blocks_per_step;
                if b >= gate_blocks / 4 && b < gate_blocks {
                    note_audio.extend_from_slice(&out[0]);
                }
                if b + 1 == gate_blocks {
                    let hz = dominant_frequency(&note_audio, sample_rate);
                    info!(key, hz, "note spectrum peak");
                    note_audio.clear();
                }
            }
        }
    }
    writer.finalize()?;
    info!(
        path = %output.display(),
        seconds = (total_blocks * BLOCK_SIZE) as f32 / sample_rate,
        "render complete"
    );
    Ok(())
}
