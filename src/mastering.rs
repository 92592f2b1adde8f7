//! Loudness mastering of the packed speech track.

use crate::error::{PipelineError, Result};
use crate::ffmpeg::{self, FFMPEG};
use std::path::Path;
use tracing::{info, warn};

const FULL_CHAIN: &str = "highpass=f=60,\
    lowpass=f=10500,\
    equalizer=f=4000:width_type=h:width=150:g=3,\
    equalizer=f=8000:width_type=h:width=300:g=-2,\
    acompressor=threshold=-18dB:ratio=2:knee=2:attack=15:release=200,\
    loudnorm=I=-16:TP=-1.5:LRA=11";

const LOUDNORM_ONLY: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

const SAMPLE_RATE: &str = "48000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    /// `None` re-encodes without any filtering.
    pub filter: Option<&'static str>,
}

pub const STRATEGIES: [Strategy; 3] = [
    Strategy {
        name: "full-chain",
        filter: Some(FULL_CHAIN),
    },
    Strategy {
        name: "loudnorm",
        filter: Some(LOUDNORM_ONLY),
    },
    Strategy {
        name: "plain",
        filter: None,
    },
];

/// Masters `input` into `output`, returning the strategy that succeeded.
pub fn enhance(input: &Path, output: &Path) -> Result<Strategy> {
    ffmpeg::locate(FFMPEG)?;
    let strategy = first_success(&STRATEGIES, |s| encode(input, output, s))?;
    info!("Mastered {} with {}", output.display(), strategy.name);
    Ok(strategy)
}

/// Tries each strategy in order. Missing tools abort at once; the last
/// strategy's error is returned when every strategy fails.
pub fn first_success<F>(strategies: &[Strategy], mut attempt: F) -> Result<Strategy>
where
    F: FnMut(&Strategy) -> Result<()>,
{
    let mut last_err = None;
    for strategy in strategies {
        match attempt(strategy) {
            Ok(()) => return Ok(*strategy),
            Err(e @ PipelineError::ToolNotFound { .. }) => return Err(e),
            Err(e) => {
                warn!("Mastering strategy '{}' failed: {}", strategy.name, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| PipelineError::Config("no mastering strategies".to_string())))
}

fn encode(input: &Path, output: &Path, strategy: &Strategy) -> Result<()> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
    ];
    if let Some(filter) = strategy.filter {
        args.extend(["-af".to_string(), filter.to_string()]);
    }
    args.extend([
        "-ar".to_string(),
        SAMPLE_RATE.to_string(),
        output.to_string_lossy().into_owned(),
    ]);
    ffmpeg::run(FFMPEG, &args, &format!("mastering ({})", strategy.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(name: &str) -> PipelineError {
        PipelineError::tool_failed("ffmpeg", name, b"Error initializing filter")
    }

    #[test]
    fn loudness_normalisation_is_in_every_filter() {
        for s in STRATEGIES.iter().filter_map(|s| s.filter) {
            assert!(s.contains("loudnorm=I=-16:TP=-1.5:LRA=11"));
        }
        assert_eq!(STRATEGIES.last().unwrap().filter, None);
    }

    #[test]
    fn first_success_wins() {
        let mut tried = Vec::new();
        let used = first_success(&STRATEGIES, |s| {
            tried.push(s.name);
            if s.name == "full-chain" { Err(failed(s.name)) } else { Ok(()) }
        })
        .unwrap();
        assert_eq!(used.name, "loudnorm");
        assert_eq!(tried, vec!["full-chain", "loudnorm"]);
    }

    #[test]
    fn exhaustion_returns_plain_encode_diagnostics() {
        let err = first_success(&STRATEGIES, |s| Err(failed(s.name))).unwrap_err();
        match err {
            PipelineError::ToolFailed {
                context,
                diagnostics,
                ..
            } => {
                assert_eq!(context, "plain");
                assert_eq!(diagnostics, "Error initializing filter");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_tool_stops_immediately() {
        let mut calls = 0;
        let err = first_success(&STRATEGIES, |_| {
            calls += 1;
            Err(PipelineError::ToolNotFound {
                tool: "ffmpeg".to_string(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::ToolNotFound { .. }));
        assert_eq!(calls, 1);
    }
}
