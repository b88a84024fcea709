use thiserror::Error;

use super::{ArtifactKind, Step};
use crate::clients::ToolError;

/// Why a step could not be completed. The message carries the tool's
/// diagnostic so it can be shown to the user as is.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} is not run by the executor")]
    NotExecutable(Step),

    #[error("Missing input: {0} has not been produced yet")]
    MissingArtifact(ArtifactKind),

    #[error("{tool} failed: {diagnostic}")]
    ToolFailed { tool: &'static str, diagnostic: String },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: &'static str, seconds: u64 },

    #[error("Malformed {artifact}: {detail}")]
    MalformedOutput {
        artifact: ArtifactKind,
        detail: String,
    },

    #[error("{0}")]
    EmptyOutput(String),

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn from_tool(tool: &'static str, error: ToolError) -> Self {
        match error {
            ToolError::Timeout { seconds, .. } => Self::Timeout { tool, seconds },
            other => Self::ToolFailed {
                tool,
                diagnostic: other.to_string(),
            },
        }
    }

    pub(crate) fn malformed(artifact: ArtifactKind, detail: impl std::fmt::Display) -> Self {
        Self::MalformedOutput {
            artifact,
            detail: detail.to_string(),
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotExecutable(_) => "not_executable",
            Self::MissingArtifact(_) => "missing_artifact",
            Self::ToolFailed { .. } => "tool_failed",
            Self::Timeout { .. } => "timeout",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::EmptyOutput(_) => "empty_output",
            Self::Io(_) => "io",
        }
    }
}
