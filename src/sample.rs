//! Sample data and the control-side sample manager.
//!
//! Samples are loaded and converted on the control thread, then shared with
//! the audio thread as `Arc<Sample>`. The audio thread only ever reads them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::keyboard::{KeyboardRange, VelocityRange};
use crate::error::SampleError;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    I16,
    F32,
}

/// Per-channel sample frames. 24 and 32 bit integer files are stored as float.
#[derive(Debug, Clone)]
pub enum SampleData {
    I16(Vec<Vec<i16>>),
    F32(Vec<Vec<f32>>),
}

/// Mapping hints carried by the sample file itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMeta {
    pub root_key: Option<i16>,
    pub key_range: Option<KeyboardRange>,
    pub velocity_range: Option<VelocityRange>,
    pub loop_points: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub id: SampleId,
    pub display_name: String,
    pub sample_rate: f32,
    pub meta: SampleMeta,
    data: SampleData,
    frames: usize,
}

fn check_channels<T>(name: &str, channels: &[Vec<T>]) -> Result<usize, SampleError> {
    let Some(first) = channels.first() else {
        return Err(SampleError::Empty { name: name.into() });
    };
    if channels.iter().any(|c| c.len() != first.len()) {
        return Err(SampleError::RaggedChannels { name: name.into() });
    }
    if first.is_empty() {
        return Err(SampleError::Empty { name: name.into() });
    }
    Ok(first.len())
}

impl Sample {
    pub fn from_f32(
        name: impl Into<String>,
        sample_rate: f32,
        channels: Vec<Vec<f32>>,
    ) -> Result<Self, SampleError> {
        let display_name = name.into();
        let frames = check_channels(&display_name, &channels)?;
        if channels.len() > 2 {
            return Err(SampleError::UnsupportedChannels {
                path: display_name.into(),
                channels: channels.len() as u16,
            });
        }
        Ok(Self {
            id: SampleId(0),
            display_name,
            sample_rate,
            meta: SampleMeta::default(),
            data: SampleData::F32(channels),
            frames,
        })
    }

    pub fn from_i16(
        name: impl Into<String>,
        sample_rate: f32,
        channels: Vec<Vec<i16>>,
    ) -> Result<Self, SampleError> {
        let display_name = name.into();
        let frames = check_channels(&display_name, &channels)?;
        if channels.len() > 2 {
            return Err(SampleError::UnsupportedChannels {
                path: display_name.into(),
                channels: channels.len() as u16,
            });
        }
        Ok(Self {
            id: SampleId(0),
            display_name,
            sample_rate,
            meta: SampleMeta::default(),
            data: SampleData::I16(channels),
            frames,
        })
    }

    pub fn with_meta(mut self, meta: SampleMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Read a WAV file. 16 bit integer stays integer, everything else becomes float.
    pub fn load_wav(path: &Path) -> Result<Self, SampleError> {
        let wav_err = |source| SampleError::Wav {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = hound::WavReader::open(path).map_err(wav_err)?;
        let spec = reader.spec();
        let channel_count = spec.channels as usize;
        if !(1..=2).contains(&channel_count) {
            return Err(SampleError::UnsupportedChannels {
                path: path.to_path_buf(),
                channels: spec.channels,
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let sample = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => {
                let mut channels = vec![Vec::new(); channel_count];
                for (i, s) in reader.samples::<i16>().enumerate() {
                    channels[i % channel_count].push(s.map_err(wav_err)?);
                }
                Sample::from_i16(name, spec.sample_rate as f32, channels)?
            }
            (hound::SampleFormat::Int, bits @ (8 | 24 | 32)) => {
                let scale = 1.0 / (1u64 << (bits - 1)) as f32;
                let mut channels = vec![Vec::new(); channel_count];
                for (i, s) in reader.samples::<i32>().enumerate() {
                    channels[i % channel_count].push(s.map_err(wav_err)? as f32 * scale);
                }
                Sample::from_f32(name, spec.sample_rate as f32, channels)?
            }
            (hound::SampleFormat::Float, 32) => {
                let mut channels = vec![Vec::new(); channel_count];
                for (i, s) in reader.samples::<f32>().enumerate() {
                    channels[i % channel_count].push(s.map_err(wav_err)?);
                }
                Sample::from_f32(name, spec.sample_rate as f32, channels)?
            }
            (format, bits) => {
                return Err(SampleError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    bits,
                    format: match format {
                        hound::SampleFormat::Int => "integer",
                        hound::SampleFormat::Float => "float",
                    },
                })
            }
        };
        debug!(
            path = %path.display(),
            frames = sample.frames,
            channels = channel_count,
            "decoded wav"
        );
        Ok(sample)
    }

    pub fn channels(&self) -> usize {
        match &self.data {
            SampleData::I16(c) => c.len(),
            SampleData::F32(c) => c.len(),
        }
    }

    pub fn is_stereo(&self) -> bool {
        self.channels() == 2
    }

    pub fn bit_depth(&self) -> BitDepth {
        match self.data {
            SampleData::I16(_) => BitDepth::I16,
            SampleData::F32(_) => BitDepth::F32,
        }
    }

    /// Frames per channel.
    pub fn sample_length(&self) -> usize {
        self.frames
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn channel_f32(&self, channel: usize) -> &[f32] {
        match &self.data {
            SampleData::F32(c) => c.get(channel).map(|v| v.as_slice()).unwrap_or(&[]),
            SampleData::I16(_) => &[],
        }
    }

    pub fn channel_i16(&self, channel: usize) -> &[i16] {
        match &self.data {
            SampleData::I16(c) => c.get(channel).map(|v| v.as_slice()).unwrap_or(&[]),
            SampleData::F32(_) => &[],
        }
    }
}

/// Owns every loaded sample on the control side.
#[derive(Debug, Default)]
pub struct SampleManager {
    samples: HashMap<SampleId, Arc<Sample>>,
    next_id: u64,
}

impl SampleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, mut sample: Sample) -> SampleId {
        self.next_id += 1;
        let id = SampleId(self.next_id);
        sample.id = id;
        self.samples.insert(id, Arc::new(sample));
        id
    }

    pub fn load_sample_by_path(&mut self, path: &Path) -> Result<SampleId, SampleError> {
        let sample = Sample::load_wav(path)?;
        let id = self.add_sample(sample);
        info!(path = %path.display(), id = id.0, "loaded sample");
        Ok(id)
    }

    pub fn get_sample(&self, id: SampleId) -> Option<Arc<Sample>> {
        self.samples.get(&id).cloned()
    }

    /// Drop the manager's handle. Zones still holding the sample keep it alive.
    pub fn remove_sample(&mut self, id: SampleId) -> bool {
        self.samples.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Forget samples no zone references any more.
    pub fn purge_unreferenced(&mut self) -> usize {
        let before = self.samples.len();
        self.samples.retain(|_, s| Arc::strong_count(s) > 1);
        before - self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, bits: u16, float: bool, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: bits,
            sample_format: if float {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };
        let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
        for i in 0..frames * channels as usize {
            if float {
                writer.write_sample((i as f32 * 0.01).sin()).expect("write");
            } else if bits == 16 {
                writer.write_sample((i as i16).wrapping_mul(37)).expect("write");
            } else {
                writer.write_sample((i as i32) << 4).expect("write");
            }
        }
        writer.finalize().expect("finalize");
    }

    #[test]
    fn test_load_16_bit_stereo_stays_integer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 16, false, 100);
        let sample = Sample::load_wav(&path).expect("load");
        assert_eq!(sample.bit_depth(), BitDepth::I16);
        assert!(sample.is_stereo());
        assert_eq!(sample.sample_length(), 100);
        assert_eq!(sample.channel_i16(1)[0], 37);
    }

    #[test]
    fn test_load_float_mono() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 32, true, 64);
        let sample = Sample::load_wav(&path).expect("load");
        assert_eq!(sample.bit_depth(), BitDepth::F32);
        assert_eq!(sample.channels(), 1);
        assert_eq!(sample.sample_rate, 44_100.0);
    }

    #[test]
    fn test_load_24_bit_converts_to_float() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("deep.wav");
        write_wav(&path, 1, 24, false, 32);
        let sample = Sample::load_wav(&path).expect("load");
        assert_eq!(sample.bit_depth(), BitDepth::F32);
        assert!(sample.channel_f32(0).iter().all(|x| x.abs() <= 1.0));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Sample::load_wav(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(err.to_string().contains("here.wav"));
        assert!(!err.guidance().is_empty());
    }

    #[test]
    fn test_empty_and_ragged_rejected() {
        assert!(matches!(
            Sample::from_f32("e", 44_100.0, vec![vec![]]),
            Err(SampleError::Empty { .. })
        ));
        assert!(matches!(
            Sample::from_f32("r", 44_100.0, vec![vec![0.0; 4], vec![0.0; 3]]),
            Err(SampleError::RaggedChannels { .. })
        ));
    }

    #[test]
    fn test_manager_assigns_ids_and_purges() {
        let mut manager = SampleManager::new();
        let a = manager.add_sample(Sample::from_f32("a", 48_000.0, vec![vec![0.0; 8]]).unwrap());
        let b = manager.add_sample(Sample::from_f32("b", 48_000.0, vec![vec![0.0; 8]]).unwrap());
        assert_ne!(a, b);
        let held = manager.get_sample(a).expect("sample a");
        assert_eq!(held.id, a);
        assert_eq!(manager.purge_unreferenced(), 1);
        assert!(manager.get_sample(a).is_some());
        assert!(manager.get_sample(b).is_none());
    }
}
