use crate::error::Result;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Sample format returned by the speech API for `pcm` responses.
pub const SPEECH_SPEC: WavSpec = WavSpec {
    channels: 1,
    sample_rate: 24_000,
    bits_per_sample: 16,
    sample_format: SampleFormat::Int,
};

/// One synthesized line on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub path: PathBuf,
    pub duration_ms: u64,
}

impl Clip {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let duration_ms = wav_duration_ms(&path)?;
        Ok(Clip { path, duration_ms })
    }
}

pub fn wav_duration_ms(path: &Path) -> Result<u64> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.len() as u64 / spec.channels as u64;
    Ok(frames_to_ms(frames, spec.sample_rate))
}

pub fn ms_to_frames(ms: u64, sample_rate: u32) -> u64 {
    ms * sample_rate as u64 / 1000
}

pub fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    frames * 1000 / sample_rate as u64
}

/// Wraps raw little-endian signed 16-bit PCM into a WAV file.
pub fn write_pcm_wav(path: &Path, pcm: &[u8], spec: WavSpec) -> Result<Clip> {
    let mut writer = WavWriter::create(path, spec)?;
    for pair in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize()?;
    Clip::open(path)
}

pub fn write_silence(path: &Path, ms: u64, spec: WavSpec) -> Result<Clip> {
    let mut writer = WavWriter::create(path, spec)?;
    let samples = ms_to_frames(ms, spec.sample_rate) * spec.channels as u64;
    for _ in 0..samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(Clip {
        path: path.to_path_buf(),
        duration_ms: ms,
    })
}
