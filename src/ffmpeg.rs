//! Thin wrappers around the ffmpeg / ffprobe command line tools.

use crate::error::{PipelineError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Resolves `tool` on PATH; a missing binary is fatal for the caller.
pub fn locate(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|_| PipelineError::ToolNotFound {
        tool: tool.to_string(),
    })
}

/// Runs `tool` to completion, attaching its stderr to the error on failure.
pub fn run<I, S>(tool: &str, args: I, context: &str) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = locate(tool)?;
    let output = Command::new(&bin).args(args).output()?;
    if !output.status.success() {
        return Err(PipelineError::tool_failed(tool, context, &output.stderr));
    }
    debug!("{} finished: {}", tool, context);
    Ok(())
}

/// Container duration in seconds as reported by ffprobe.
pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let bin = locate(FFPROBE)?;
    let output = Command::new(&bin)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()?;

    let context = format!("probing {}", path.display());
    if !output.status.success() {
        return Err(PipelineError::tool_failed(FFPROBE, &context, &output.stderr));
    }
    parse_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| PipelineError::ToolFailed {
        tool: FFPROBE.to_string(),
        context,
        diagnostics: "unparseable duration".to_string(),
    })
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Escapes a path for use inside an ffmpeg filter argument.
pub fn filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_reported_by_name() {
        let err = locate("definitely-not-a-real-tool-4711").unwrap_err();
        assert!(matches!(err, PipelineError::ToolNotFound { ref tool } if tool == "definitely-not-a-real-tool-4711"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_carries_stderr() {
        let err = run("sh", ["-c", "echo broken pipe >&2; exit 3"], "testing").unwrap_err();
        match err {
            PipelineError::ToolFailed {
                tool,
                context,
                diagnostics,
            } => {
                assert_eq!(tool, "sh");
                assert_eq!(context, "testing");
                assert_eq!(diagnostics, "broken pipe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parses_probe_output() {
        assert_eq!(parse_duration("12.480000\n"), Some(12.48));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration("-1"), None);
    }

    #[test]
    fn escapes_filter_paths() {
        assert_eq!(filter_path(Path::new("C:\\tmp\\a'b.srt")), "C\\:/tmp/a\\'b.srt");
    }
}
