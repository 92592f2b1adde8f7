//! Error types for the generation pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    // External tools
    #[error("Required tool not found in PATH: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed while {context}: {diagnostics}")]
    ToolFailed {
        tool: String,
        context: String,
        diagnostics: String,
    },

    // Audio assembly
    #[error("Audio error: {0}")]
    Audio(#[from] hound::Error),

    #[error("Clip {path} has format {actual}, expected {expected}")]
    ClipFormatMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    // Remote services
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Upload failed: {0}")]
    Upload(String),

    // Data
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn tool_failed(tool: &str, context: &str, stderr: &[u8]) -> Self {
        PipelineError::ToolFailed {
            tool: tool.to_string(),
            context: context.to_string(),
            diagnostics: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}
