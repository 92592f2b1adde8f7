//! Burns the manifest's subtitle rows over the background and the mastered
//! track. Long manifests are rendered in chunks and joined losslessly.

use crate::config::{FRAME_H, FRAME_W};
use crate::error::{PipelineError, Result};
use crate::ffmpeg::{self, FFMPEG, filter_path};
use crate::manifest::{self, ManifestRow};
use crate::subtitle::{build_srt_entries, write_srt};
use std::fmt::Write as _;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::info;

const FPS: &str = "30";
/// Rows may overrun the probed audio by this much before we refuse.
/// The mp3 encoder pads and rounds to whole frames, so ffprobe reports the
/// mastered track a few ms off the WAV the rows were timed against.
const DURATION_TOLERANCE_SEC: f64 = 0.05;
/// libass lays SRT cues out on a 288-line canvas.
const SRT_CANVAS_H: u32 = 288;
/// (font size px, anchor y px) for the speech row and every row below it.
const ROW_LAYOUT: [(u32, u32); 2] = [(50, 920), (45, 1080)];

pub struct RenderJob<'a> {
    pub manifest: &'a Path,
    pub rows: usize,
    pub audio: &'a Path,
    pub background: &'a Path,
    pub fonts_dir: &'a Path,
    pub work_dir: &'a Path,
    pub out: &'a Path,
    pub chunk: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    pub lines: Range<usize>,
    pub start: f64,
    pub len: f64,
}

pub fn render(job: &RenderJob<'_>) -> Result<PathBuf> {
    ffmpeg::locate(FFMPEG)?;
    let lines = manifest::read(job.manifest, job.rows)?;
    let audio_secs = ffmpeg::probe_duration_seconds(job.audio)?;
    validate(&lines, audio_secs)?;

    fs::create_dir_all(job.work_dir)?;
    if let Some(parent) = job.out.parent() {
        fs::create_dir_all(parent)?;
    }

    let spans = plan_chunks(&lines, job.chunk);
    let mut parts = Vec::with_capacity(spans.len());
    for (idx, span) in spans.iter().enumerate() {
        info!(
            "Rendering part {}/{} | lines={} start={:.1}s len={:.1}s",
            idx + 1,
            spans.len(),
            span.lines.len(),
            span.start,
            span.len
        );
        let audio_part = job.work_dir.join(format!("audio_{:03}.mp3", idx));
        cut_audio(job.audio, span, &audio_part)?;

        let mut srts = Vec::with_capacity(job.rows);
        for row in 0..job.rows {
            let srt = job.work_dir.join(format!("part_{:03}_row{}.srt", idx, row));
            write_srt(&srt, &build_srt_entries(&lines[span.lines.clone()], row))?;
            srts.push(srt);
        }

        let part = job.work_dir.join(format!("part_{:03}.mp4", idx));
        render_part(job.background, &audio_part, &srts, job.fonts_dir, &part)?;
        parts.push(part);
    }

    concat_parts(&parts, job.work_dir, job.out)?;
    info!("Final video written to {}", job.out.display());
    Ok(job.out.to_path_buf())
}

/// Rows must fit inside the audio they are timed against.
pub fn validate(lines: &[ManifestRow], audio_secs: f64) -> Result<()> {
    if lines.is_empty() {
        return Err(PipelineError::Manifest("nothing to render".to_string()));
    }
    let total = manifest::total_duration(lines);
    if total > audio_secs + DURATION_TOLERANCE_SEC {
        return Err(PipelineError::Manifest(format!(
            "rows last {:.3}s but the audio is only {:.3}s",
            total, audio_secs
        )));
    }
    Ok(())
}

/// Splits the manifest into runs of `chunk` lines with their audio spans.
pub fn plan_chunks(lines: &[ManifestRow], chunk: usize) -> Vec<ChunkSpan> {
    let chunk = chunk.max(1);
    let mut spans = Vec::new();
    let mut start = 0.0_f64;
    let mut first = 0;
    while first < lines.len() {
        let last = (first + chunk).min(lines.len());
        let len = manifest::total_duration(&lines[first..last]);
        spans.push(ChunkSpan {
            lines: first..last,
            start,
            len,
        });
        start += len;
        first = last;
    }
    spans
}

fn cut_audio(full: &Path, span: &ChunkSpan, out: &Path) -> Result<()> {
    let start = format!("{:.3}", span.start);
    let len = format!("{:.3}", span.len);
    let full = full.to_string_lossy();
    let out = out.to_string_lossy();
    ffmpeg::run(
        FFMPEG,
        ["-y", "-ss", &*start, "-t", &*len, "-i", &*full, "-acodec", "copy", &*out],
        "cutting audio chunk",
    )
}

fn ass_units(px: u32) -> u32 {
    (px * SRT_CANVAS_H + FRAME_H / 2) / FRAME_H
}

fn subtitle_filter(srts: &[PathBuf], fonts_dir: &Path) -> String {
    let mut vf = format!("scale={}:{},setsar=1", FRAME_W, FRAME_H);
    for (row, srt) in srts.iter().enumerate() {
        let (size, y) = ROW_LAYOUT[row.min(ROW_LAYOUT.len() - 1)];
        let _ = write!(
            vf,
            ",subtitles={}:fontsdir={}:force_style='Fontsize={},PrimaryColour=&H00FFFFFF,\
             BorderStyle=3,BackColour=&H73000000,Outline=2,Shadow=0,Alignment=8,MarginV={}'",
            filter_path(srt),
            filter_path(fonts_dir),
            ass_units(size),
            ass_units(y + row.saturating_sub(1) as u32 * 120)
        );
    }
    vf
}

fn render_part(background: &Path, audio: &Path, srts: &[PathBuf], fonts_dir: &Path, out: &Path) -> Result<()> {
    let vf = subtitle_filter(srts, fonts_dir);
    let background = background.to_string_lossy();
    let audio = audio.to_string_lossy();
    let out = out.to_string_lossy();
    ffmpeg::run(
        FFMPEG,
        [
            "-y",
            "-loop",
            "1",
            "-framerate",
            FPS,
            "-i",
            &*background,
            "-i",
            &*audio,
            "-vf",
            vf.as_str(),
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-r",
            FPS,
            "-shortest",
            &*out,
        ],
        "rendering video part",
    )
}

fn concat_parts(parts: &[PathBuf], work_dir: &Path, out: &Path) -> Result<()> {
    let list = work_dir.join("concat.txt");
    let mut body = String::new();
    for p in parts {
        let name = p
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::Manifest(format!("invalid part name {}", p.display())))?;
        let _ = writeln!(body, "file '{}'", name);
    }
    fs::write(&list, body)?;

    let list = list.to_string_lossy();
    let out = out.to_string_lossy();
    ffmpeg::run(
        FFMPEG,
        ["-y", "-f", "concat", "-safe", "0", "-i", &*list, "-c", "copy", &*out],
        "concatenating video parts",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Speaker;

    fn rows(durations: &[f64]) -> Vec<ManifestRow> {
        durations
            .iter()
            .map(|d| ManifestRow {
                speaker: Speaker::Narrator,
                subtitles: vec!["x".to_string()],
                duration: *d,
            })
            .collect()
    }

    #[test]
    fn chunks_cover_every_line_in_order() {
        let spans = plan_chunks(&rows(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0], ChunkSpan { lines: 0..2, start: 0.0, len: 3.0 });
        assert_eq!(spans[1], ChunkSpan { lines: 2..4, start: 3.0, len: 7.0 });
        assert_eq!(spans[2], ChunkSpan { lines: 4..5, start: 10.0, len: 5.0 });
    }

    #[test]
    fn large_chunk_renders_in_one_part() {
        let spans = plan_chunks(&rows(&[1.0, 2.0]), 9999);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].lines, 0..2);
    }

    #[test]
    fn zero_chunk_is_treated_as_one() {
        assert_eq!(plan_chunks(&rows(&[1.0, 2.0]), 0).len(), 2);
    }

    #[test]
    fn rows_may_not_outlast_audio() {
        let lines = rows(&[10.12, 10.12, 4.76]);
        assert!(validate(&lines, 25.0).is_ok());
        assert!(validate(&lines, 24.96).is_ok());
        assert!(matches!(validate(&lines, 24.9), Err(PipelineError::Manifest(_))));
        assert!(validate(&[], 10.0).is_err());
    }

    #[test]
    fn filter_stacks_one_subtitle_layer_per_row() {
        let srts = vec![PathBuf::from("t/a.srt"), PathBuf::from("t/b.srt")];
        let vf = subtitle_filter(&srts, Path::new("fonts"));
        assert!(vf.starts_with("scale=1080:1920,setsar=1,subtitles=t/a.srt:fontsdir=fonts:"));
        assert_eq!(vf.matches("subtitles=").count(), 2);
        assert!(vf.contains("Fontsize=8,"));
        assert!(vf.contains("Fontsize=7,"));
        assert!(vf.contains("MarginV=138'"));
        assert!(vf.contains("MarginV=162'"));
    }
}
