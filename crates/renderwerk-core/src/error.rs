// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Renderwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DeclaredType, Stage};

/// Top-level error type for all Renderwerk operations.
#[derive(Debug, Error)]
pub enum RenderwerkError {
    // -- Request errors --
    #[error("unsupported file type {declared} for {operation}")]
    UnsupportedType {
        declared: DeclaredType,
        operation: &'static str,
    },

    // -- Raster codec errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("preview of {width}x{height} exceeds the {limit} pixel limit")]
    PreviewTooLarge { width: u32, height: u32, limit: u64 },

    // -- External tool errors --
    #[error("{stage} failed: {diagnostic}")]
    ToolInvocation { stage: Stage, diagnostic: String },

    /// Extraction failed because the document structure is damaged. The OCR
    /// pipeline answers this with a single repair attempt.
    #[error("malformed document during {stage}: {diagnostic}")]
    MalformedDocument { stage: Stage, diagnostic: String },

    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: Stage },

    #[error("cancelled during {stage}")]
    Cancelled { stage: Stage },

    // -- Infrastructure --
    #[error("working area error: {0}")]
    Workspace(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render server error: {0}")]
    Server(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable, machine-readable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    UnsupportedType,
    DecodeError,
    EncodeError,
    LimitExceeded,
    ToolInvocation,
    MalformedDocument,
    DeadlineExceeded,
    Cancelled,
    Internal,
}

impl FailureKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedType => "unsupported-type",
            Self::DecodeError => "decode-error",
            Self::EncodeError => "encode-error",
            Self::LimitExceeded => "limit-exceeded",
            Self::ToolInvocation => "tool-invocation",
            Self::MalformedDocument => "malformed-document",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl RenderwerkError {
    pub fn tool(stage: Stage, diagnostic: impl Into<String>) -> Self {
        Self::ToolInvocation {
            stage,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn malformed(stage: Stage, diagnostic: impl Into<String>) -> Self {
        Self::MalformedDocument {
            stage,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedType { .. } => FailureKind::UnsupportedType,
            Self::Decode(_) => FailureKind::DecodeError,
            Self::Encode(_) => FailureKind::EncodeError,
            Self::PreviewTooLarge { .. } => FailureKind::LimitExceeded,
            Self::ToolInvocation { .. } => FailureKind::ToolInvocation,
            Self::MalformedDocument { .. } => FailureKind::MalformedDocument,
            Self::DeadlineExceeded { .. } => FailureKind::DeadlineExceeded,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::Workspace(_)
            | Self::Config(_)
            | Self::Server(_)
            | Self::Io(_)
            | Self::Serialization(_) => FailureKind::Internal,
        }
    }

    /// The stage this error originated in, when it came out of a pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UnsupportedType { .. } => Some(Stage::Dispatch),
            Self::Decode(_) => Some(Stage::Decode),
            Self::Encode(_) | Self::PreviewTooLarge { .. } => Some(Stage::Encode),
            Self::ToolInvocation { stage, .. }
            | Self::MalformedDocument { stage, .. }
            | Self::DeadlineExceeded { stage }
            | Self::Cancelled { stage } => Some(*stage),
            Self::Workspace(_) => Some(Stage::Workspace),
            _ => None,
        }
    }

    /// The external tool's diagnostic text, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ToolInvocation { diagnostic, .. }
            | Self::MalformedDocument { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }

    pub fn is_malformed_document(&self) -> bool {
        matches!(self, Self::MalformedDocument { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RenderwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_carries_stage_and_diagnostic() {
        let err = RenderwerkError::tool(Stage::Decrypt, "qpdf: invalid password");
        assert_eq!(err.stage(), Some(Stage::Decrypt));
        assert_eq!(err.diagnostic(), Some("qpdf: invalid password"));
        assert_eq!(err.kind(), FailureKind::ToolInvocation);
        assert_eq!(err.to_string(), "decrypt failed: qpdf: invalid password");
    }

    #[test]
    fn malformed_is_distinct_from_tool_failure() {
        let err = RenderwerkError::malformed(Stage::Extract, "Couldn't read xref table");
        assert!(err.is_malformed_document());
        assert_eq!(err.kind(), FailureKind::MalformedDocument);
        assert!(!RenderwerkError::tool(Stage::Extract, "malformed").is_malformed_document());
    }

    #[test]
    fn oversized_preview_is_a_limit_error() {
        let err = RenderwerkError::PreviewTooLarge {
            width: 200_000,
            height: 200_000,
            limit: 40_000_000,
        };
        assert_eq!(err.kind(), FailureKind::LimitExceeded);
        assert_eq!(err.kind().code(), "limit-exceeded");
        assert_eq!(err.stage(), Some(Stage::Encode));
    }

    #[test]
    fn io_errors_are_internal() {
        let err: RenderwerkError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), FailureKind::Internal);
        assert_eq!(err.stage(), None);
    }
}
