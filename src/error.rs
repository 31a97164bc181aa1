use std::path::PathBuf;

use thiserror::Error;

use crate::engine::bus::BusAddress;

/// Failures while loading or validating sample data.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("unable to read '{path}': {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("'{path}' has {channels} channels; only mono and stereo samples are supported")]
    UnsupportedChannels { path: PathBuf, channels: u16 },
    #[error("'{path}' uses an unsupported {bits}-bit {format} encoding")]
    UnsupportedFormat {
        path: PathBuf,
        bits: u16,
        format: &'static str,
    },
    #[error("sample '{name}' contains no frames")]
    Empty { name: String },
    #[error("sample '{name}' has channels of different lengths")]
    RaggedChannels { name: String },
}

impl SampleError {
    /// Short hint shown to the user next to the error text.
    pub fn guidance(&self) -> &'static str {
        match self {
            SampleError::Wav { .. } => "Check that the file exists and is a valid WAV file.",
            SampleError::UnsupportedChannels { .. } => "Convert the file to mono or stereo.",
            SampleError::UnsupportedFormat { .. } => {
                "Convert the file to 16 or 24 bit integer or 32 bit float PCM."
            }
            SampleError::Empty { .. } | SampleError::RaggedChannels { .. } => {
                "The sample data is unusable; try re-exporting it."
            }
        }
    }
}

/// Failures reported by the control-side engine API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no part at index {0}")]
    NoSuchPart(usize),
    #[error("no group {group} in part {part}")]
    NoSuchGroup { part: usize, group: usize },
    #[error("no zone {zone} in part {part} group {group}")]
    NoSuchZone {
        part: usize,
        group: usize,
        zone: usize,
    },
    #[error("no bus at {0:?}")]
    NoSuchBus(BusAddress),
    #[error("slot {slot} out of range (max {max})")]
    SlotOutOfRange { slot: usize, max: usize },
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(f32),
    #[error("the audio thread message queue is full")]
    QueueFull,
    #[error(transparent)]
    Sample(#[from] SampleError),
}
