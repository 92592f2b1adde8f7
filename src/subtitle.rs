use crate::error::Result;
use crate::lang::{Speaker, is_cjk, is_hangul};
use crate::manifest::ManifestRow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const FONT_LATIN: &str = "Roboto Serif";
pub const FONT_CJK: &str = "Noto Sans JP";
pub const FONT_HANGUL: &str = "Malgun Gothic";

const CJK_WRAP: usize = 16;
const LATIN_WRAP: usize = 32;

/// Font family for the first distinctive script found in `text`.
pub fn pick_font(text: &str) -> &'static str {
    for c in text.chars() {
        if is_hangul(c) {
            return FONT_HANGUL;
        }
        if is_cjk(c) {
            return FONT_CJK;
        }
    }
    FONT_LATIN
}

/// Hard wrap for scripts without spaces between words.
pub fn wrap_cjk(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect::<String>().trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Hard wrap for CJK text, word wrap for everything else.
pub fn wrap_for_script(text: &str, cjk_width: usize, latin_width: usize) -> Vec<String> {
    if text.chars().any(is_cjk) {
        wrap_cjk(text, cjk_width)
    } else {
        wrap_text(text, latin_width)
    }
}

/// Subtitle text for one row of one manifest line. The first row carries
/// the speaker label unless the line is narration.
pub fn row_text(speaker: Speaker, row: usize, text: &str) -> String {
    let body = text.trim();
    let mut lines = wrap_for_script(body, CJK_WRAP, LATIN_WRAP);
    if row == 0 && speaker != Speaker::Narrator {
        match lines.first_mut() {
            Some(first) => *first = format!("{}: {}", speaker.label(), first),
            None => lines.push(format!("{}:", speaker.label())),
        }
    }
    format!(
        "<font face=\"{}\">{}</font>",
        pick_font(body),
        lines.join("\n")
    )
}

/// One SRT cue per manifest line for subtitle row `row`, back to back.
/// Lines with an empty row are skipped but still advance the clock.
pub fn build_srt_entries(lines: &[ManifestRow], row: usize) -> Vec<(f64, f64, String)> {
    let mut entries = Vec::new();
    let mut cumulative_seconds = 0.0_f64;
    for line in lines {
        let start = cumulative_seconds;
        let end = start + line.duration;
        cumulative_seconds = end;
        let Some(text) = line.subtitles.get(row) else {
            continue;
        };
        if text.trim().is_empty() || line.duration <= 0.0 {
            continue;
        }
        entries.push((start, end, row_text(line.speaker, row, text)));
    }
    entries
}

pub fn write_srt(path: &Path, entries: &[(f64, f64, String)]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    for (i, (start, end, text)) in entries.iter().enumerate() {
        writeln!(f, "{}", i + 1)?;
        writeln!(f, "{} --> {}", format_srt_time(*start), format_srt_time(*end))?;
        writeln!(f, "{}", text)?;
        writeln!(f)?;
    }
    f.flush()?;
    Ok(())
}

fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if current.chars().count() + word.chars().count() + 1 > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(speaker: Speaker, subs: &[&str], duration: f64) -> ManifestRow {
        ManifestRow {
            speaker,
            subtitles: subs.iter().map(|s| s.to_string()).collect(),
            duration,
        }
    }

    #[test]
    fn formats_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(10.12), "00:00:10,120");
        assert_eq!(format_srt_time(3723.4567), "01:02:03,457");
    }

    #[test]
    fn picks_font_by_script() {
        assert_eq!(pick_font("Hello"), FONT_LATIN);
        assert_eq!(pick_font("Hi こんにちは"), FONT_CJK);
        assert_eq!(pick_font("안녕하세요"), FONT_HANGUL);
    }

    #[test]
    fn wraps_cjk_every_sixteen_chars() {
        let text = "あ".repeat(20);
        let lines = wrap_cjk(&text, 16);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), 16);
        assert_eq!(lines[1].chars().count(), 4);
    }

    #[test]
    fn wraps_latin_on_word_boundaries() {
        let lines = wrap_text("one two three four five six seven eight nine", 14);
        assert_eq!(lines, vec!["one two three", "four five six", "seven eight", "nine"]);
    }

    #[test]
    fn label_only_on_first_row_of_dialogue() {
        assert_eq!(
            row_text(Speaker::Bob, 0, "Sure."),
            "<font face=\"Roboto Serif\">Bob: Sure.</font>"
        );
        assert_eq!(
            row_text(Speaker::Bob, 1, "はい。"),
            "<font face=\"Noto Sans JP\">はい。</font>"
        );
        assert_eq!(
            row_text(Speaker::Narrator, 0, "Welcome."),
            "<font face=\"Roboto Serif\">Welcome.</font>"
        );
    }

    #[test]
    fn entries_follow_cumulative_durations() {
        let lines = vec![
            row(Speaker::Alice, &["Hi.", "やあ。"], 1.5),
            row(Speaker::Bob, &["Hello.", ""], 2.0),
            row(Speaker::Alice, &["Bye.", "じゃあ。"], 0.5),
        ];
        let top = build_srt_entries(&lines, 0);
        assert_eq!(top.len(), 3);
        assert_eq!((top[1].0, top[1].1), (1.5, 3.5));
        let bottom = build_srt_entries(&lines, 1);
        assert_eq!(bottom.len(), 2);
        assert_eq!((bottom[1].0, bottom[1].1), (3.5, 4.0));
    }

    #[test]
    fn writes_numbered_cues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.srt");
        write_srt(&path, &[(0.0, 1.25, "a".to_string()), (1.25, 2.0, "b".to_string())]).unwrap();
        let srt = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,250\na\n\n2\n00:00:01,250 --> 00:00:02,000\nb\n\n"
        );
    }
}
