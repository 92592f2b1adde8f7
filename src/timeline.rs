//! Packs speech clips and inter-line silence into a fixed time budget.
//!
//! Clips keep their original order. When the budget runs out the last
//! emitted clip (or its trailing gap) is cut so the track ends exactly on
//! the budget; everything after it is dropped.

use crate::audio::{Clip, SPEECH_SPEC, ms_to_frames};
use crate::error::{PipelineError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// How much of one clip (and of the silence after it) ends up in the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub clip: usize,
    pub clip_ms: u64,
    pub gap_ms: u64,
}

impl Segment {
    pub fn realized_ms(&self) -> u64 {
        self.clip_ms + self.gap_ms
    }

    pub fn realized_secs(&self) -> f64 {
        self.realized_ms() as f64 / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub segments: Vec<Segment>,
}

impl Timeline {
    pub fn total_ms(&self) -> u64 {
        self.segments.iter().map(Segment::realized_ms).sum()
    }

    /// Seconds per emitted line, trailing gap included.
    pub fn realized_durations(&self) -> Vec<f64> {
        self.segments.iter().map(Segment::realized_secs).collect()
    }

    pub fn truncated(&self, natural: &[u64]) -> bool {
        match self.segments.last() {
            None => !natural.is_empty(),
            Some(last) => {
                self.segments.len() < natural.len() || last.clip_ms < natural[last.clip]
            }
        }
    }
}

/// Decides, clip by clip, what fits into `budget_ms`.
pub fn plan(durations: &[u64], gap_ms: u64, budget_ms: u64) -> Timeline {
    let mut segments = Vec::with_capacity(durations.len());
    if budget_ms == 0 {
        return Timeline { segments };
    }
    let mut elapsed = 0u64;
    let last = durations.len().saturating_sub(1);

    for (clip, &clip_ms) in durations.iter().enumerate() {
        let gap = if clip < last { gap_ms } else { 0 };
        let remain = budget_ms.saturating_sub(elapsed);

        // Zero-length clips still fit a budget that is exactly spent.
        let need = clip_ms + gap;
        if need <= remain {
            segments.push(Segment {
                clip,
                clip_ms,
                gap_ms: gap,
            });
            elapsed += need;
            continue;
        }

        if remain == 0 {
            break;
        }
        if remain <= clip_ms {
            segments.push(Segment {
                clip,
                clip_ms: remain,
                gap_ms: 0,
            });
        } else {
            segments.push(Segment {
                clip,
                clip_ms,
                gap_ms: remain - clip_ms,
            });
        }
        break;
    }

    Timeline { segments }
}

/// Merges `clips` into one WAV at `out` (overwritten) and returns the
/// realized duration of every emitted line in seconds.
pub fn concat_trim_to(clips: &[Clip], gap_ms: u64, budget_ms: u64, out: &Path) -> Result<Vec<f64>> {
    let durations: Vec<u64> = clips.iter().map(|c| c.duration_ms).collect();
    let timeline = plan(&durations, gap_ms, budget_ms);
    debug!(?timeline, "Packed timeline");

    let spec = match clips.first() {
        Some(first) => WavReader::open(&first.path)?.spec(),
        None => SPEECH_SPEC,
    };
    if spec.sample_format != SampleFormat::Int {
        return Err(PipelineError::ClipFormatMismatch {
            path: clips[0].path.display().to_string(),
            expected: "integer PCM".to_string(),
            actual: describe(&spec),
        });
    }

    if out.exists() {
        fs::remove_file(out)?;
    }
    let mut writer = WavWriter::create(out, spec)?;

    // Frame boundaries come from the running ms total so rounding never accumulates.
    let mut at_ms = 0u64;
    for segment in &timeline.segments {
        let clip = &clips[segment.clip];
        let mut reader = WavReader::open(&clip.path)?;
        if reader.spec() != spec {
            return Err(PipelineError::ClipFormatMismatch {
                path: clip.path.display().to_string(),
                expected: describe(&spec),
                actual: describe(&reader.spec()),
            });
        }

        let clip_start = ms_to_frames(at_ms, spec.sample_rate);
        at_ms += segment.clip_ms;
        let clip_end = ms_to_frames(at_ms, spec.sample_rate);
        let wanted = (clip_end - clip_start) * spec.channels as u64;
        let mut written = 0u64;
        for sample in reader.samples::<i32>().take(wanted as usize) {
            writer.write_sample(sample?)?;
            written += 1;
        }
        // Header durations can round a frame short of the data.
        for _ in written..wanted {
            writer.write_sample(0i32)?;
        }

        at_ms += segment.gap_ms;
        let silence = (ms_to_frames(at_ms, spec.sample_rate) - clip_end) * spec.channels as u64;
        for _ in 0..silence {
            writer.write_sample(0i32)?;
        }
    }
    writer.finalize()?;

    info!(
        "Packed {}/{} clips into {} ms (budget {} ms)",
        timeline.segments.len(),
        clips.len(),
        timeline.total_ms(),
        budget_ms
    );
    if timeline.truncated(&durations) {
        warn!("Narration exceeded {} ms; trailing lines were cut", budget_ms);
    }
    Ok(timeline.realized_durations())
}

fn describe(spec: &WavSpec) -> String {
    format!(
        "{} Hz, {} ch, {} bit {:?}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    )
}
