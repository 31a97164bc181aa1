//! saavy-sampler - play or render WAV files through the sampler engine
//!
//! Run with: cargo run -- play kick.wav snare.wav
//!      or:  cargo run -- render piano.wav --notes 60,64,67 -o out.wav

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

use saavy_sampler::EngineConfig;

#[derive(Parser)]
#[command(name = "saavy-sampler")]
#[command(about = "Polyphonic sample playback engine", long_about = None)]
struct Cli {
    /// TOML file with engine settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the config's voice limit
    #[arg(long, global = true)]
    max_voices: Option<usize>,

    /// Override the render sample rate (playback uses the device rate)
    #[arg(long, global = true)]
    sample_rate: Option<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play notes through the default audio device
    Play {
        /// Sample files, one zone each, all on part 0
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        /// MIDI keys to play in turn
        #[arg(short, long, value_delimiter = ',', default_value = "60,64,67,72")]
        notes: Vec<i16>,

        /// Seconds between note starts
        #[arg(short, long, default_value = "0.5")]
        step: f32,

        /// How many passes over the note list
        #[arg(short, long, default_value = "2")]
        repeat: usize,
    },
    /// Render notes offline to a 32-bit float WAV file
    Render {
        #[arg(required = true)]
        samples: Vec<PathBuf>,

        #[arg(short, long, value_delimiter = ',', default_value = "60,64,67,72")]
        notes: Vec<i16>,

        #[arg(short, long, default_value = "0.5")]
        step: f32,

        /// Extra seconds after the last note for release tails
        #[arg(short, long, default_value = "1.0")]
        tail: f32,

        #[arg(short, long, default_value = "100")]
        velocity: i16,

        #[arg(short, long, default_value = "out.wav")]
        output: PathBuf,

        /// Log the strongest frequency of each rendered note
        #[arg(long)]
        analyze: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&contents)
        .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(max_voices) = cli.max_voices {
        config.max_voices = max_voices;
    }
    if let Some(sample_rate) = cli.sample_rate {
        config.sample_rate = sample_rate;
    }

    match cli.command {
        Command::Play {
            samples,
            notes,
            step,
            repeat,
        } => app::play(config, &samples, &notes, step, repeat),
        Command::Render {
            samples,
            notes,
            step,
            tail,
            velocity,
            output,
            analyze,
        } => app::render(
            config,
            &samples,
            &app::NoteSchedule {
                notes,
                step,
                tail,
                velocity,
            },
            &output,
            analyze,
        ),
    }
}
