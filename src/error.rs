//! Error taxonomy for tool calls, decisions, persistence and run failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single tool call. Never fatal to a run on its own.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    /// Caller error detected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool arguments did not match the tool's schema or preconditions.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Non-2xx status, transport failure or malformed payload.
    #[error("upstream error{}: {body}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Upstream { status: Option<u16>, body: String },

    /// The request exceeded its deadline.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ToolError {
    pub fn upstream(status: Option<u16>, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > crate::constants::UPSTREAM_BODY_LIMIT {
            let mut end = crate::constants::UPSTREAM_BODY_LIMIT;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        Self::Upstream { status, body }
    }

    /// Classification recorded in the transcript.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            // Unknown tool names are treated like malformed arguments: the
            // decider sees them and may correct itself.
            Self::InvalidArguments(_) | Self::UnknownTool(_) => FailureKind::InvalidArguments,
            Self::Upstream { .. } => FailureKind::Upstream,
            Self::Timeout(_) => FailureKind::Timeout,
        }
    }
}

/// Serializable classification of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    InvalidArguments,
    Upstream,
    Timeout,
}

/// The decision function could not produce a decision.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision function unavailable: {0}")]
    Unavailable(String),
}

/// Persistence of a generated image failed. The image bytes are kept.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a run ended without all four images.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("iteration budget exhausted")]
    IterationBudgetExhausted,

    #[error("decision function finished before all images were generated")]
    FinishedEarly,

    #[error("image synthesis failed for at least one variant")]
    PartialSynthesisFailure,

    #[error("prompt variant generation failed: {0}")]
    UpstreamError(String),

    #[error("decision function unavailable: {0}")]
    DecisionUnavailable(String),

    #[error("run cancelled")]
    Cancelled,
}
