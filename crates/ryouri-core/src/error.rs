//! Send cycle error types

use reqwest::StatusCode;
use thiserror::Error;

/// Any failure between issuing a request and extracting the reply text.
///
/// Every variant collapses to the same fallback turn in the transcript; the
/// variants exist for logs and for callers that want to render differently.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response has no content[0].text")]
    MissingText,

    #[error("request task ended abnormally: {0}")]
    Task(String),
}

impl SendError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            SendError::Transport(_) => "transport",
            SendError::Status { .. } => "status",
            SendError::Decode(_) => "decode",
            SendError::MissingText => "missing_text",
            SendError::Task(_) => "task",
        }
    }
}
