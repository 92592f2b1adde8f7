//! `lines.json`: the per-run list of subtitle rows and durations handed to
//! the renderer. Each row is a flat JSON array
//! `[speaker, subtitle_1, .., subtitle_k, duration_seconds]`.

use crate::dialogue::ScriptLine;
use crate::error::{PipelineError, Result};
use crate::lang::Speaker;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    pub speaker: Speaker,
    pub subtitles: Vec<String>,
    pub duration: f64,
}

impl ManifestRow {
    fn to_value(&self) -> Value {
        let mut cells = Vec::with_capacity(self.subtitles.len() + 2);
        cells.push(Value::from(self.speaker.label()));
        cells.extend(self.subtitles.iter().map(|s| Value::from(s.as_str())));
        cells.push(Value::from(self.duration));
        Value::Array(cells)
    }

    fn from_value(idx: usize, value: &Value, width: usize) -> Result<Self> {
        let bad = |why: &str| PipelineError::Manifest(format!("row {}: {}", idx, why));
        let cells = value.as_array().ok_or_else(|| bad("not an array"))?;
        if cells.len() != width + 2 {
            return Err(bad(&format!(
                "expected {} subtitle rows, found {}",
                width,
                cells.len().saturating_sub(2)
            )));
        }
        let speaker = cells[0]
            .as_str()
            .and_then(Speaker::parse)
            .ok_or_else(|| bad("unknown speaker"))?;
        let subtitles = cells[1..=width]
            .iter()
            .map(|c| c.as_str().map(str::to_string).ok_or_else(|| bad("subtitle is not a string")))
            .collect::<Result<Vec<_>>>()?;
        let duration = cells[width + 1]
            .as_f64()
            .filter(|d| *d >= 0.0)
            .ok_or_else(|| bad("duration must be a non-negative number"))?;
        Ok(Self {
            speaker,
            subtitles,
            duration,
        })
    }
}

/// Zips the script with its subtitle rows and realized durations. Lines the
/// packer dropped are discarded so every row has a duration.
pub fn build(script: &[ScriptLine], subtitles: &[Vec<String>], durations: &[f64]) -> Vec<ManifestRow> {
    script
        .iter()
        .zip(subtitles)
        .zip(durations)
        .map(|((line, subs), duration)| ManifestRow {
            speaker: line.speaker,
            subtitles: subs.clone(),
            duration: *duration,
        })
        .collect()
}

pub fn write(path: &Path, rows: &[ManifestRow]) -> Result<()> {
    let doc = Value::Array(rows.iter().map(ManifestRow::to_value).collect());
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    info!("Wrote {} manifest rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads a manifest whose rows carry exactly `width` subtitles each.
pub fn read(path: &Path, width: usize) -> Result<Vec<ManifestRow>> {
    let doc: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    let rows = doc
        .as_array()
        .ok_or_else(|| PipelineError::Manifest("top level is not an array".to_string()))?;
    rows.iter()
        .enumerate()
        .map(|(i, v)| ManifestRow::from_value(i, v, width))
        .collect()
}

pub fn total_duration(rows: &[ManifestRow]) -> f64 {
    rows.iter().map(|r| r.duration).sum()
}
