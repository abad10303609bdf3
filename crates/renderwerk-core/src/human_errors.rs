// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing error messages.
//
// Every terminal failure is mapped to a stable code, a one-line message with
// an operation-specific prefix, and a suggestion for the operator. Callers
// discriminate on `code`; the prose is for people.

use crate::error::{FailureKind, RenderwerkError};
use crate::types::{OCR_SUCCESS_MESSAGE, PREVIEW_SUCCESS_MESSAGE};

/// Which public operation produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Preview,
    Ocr,
}

impl Operation {
    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Preview => PREVIEW_SUCCESS_MESSAGE,
            Self::Ocr => OCR_SUCCESS_MESSAGE,
        }
    }

    /// Prefix of every failure message. Never a prefix of a success message.
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Preview => "Preview failed, ",
            Self::Ocr => "OCR failed, ",
        }
    }
}

/// A caller-facing failure description.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Stable machine-readable code (e.g. `malformed-document`).
    pub code: &'static str,
    /// Prefixed one-line message.
    pub message: String,
    /// What an operator could try.
    pub suggestion: String,
    /// Whether retrying the same request may succeed.
    pub retriable: bool,
}

/// Convert a `RenderwerkError` into a `HumanError` for the given operation.
pub fn humanize_error(operation: Operation, err: &RenderwerkError) -> HumanError {
    let kind = err.kind();
    let (suggestion, retriable) = match kind {
        FailureKind::UnsupportedType => (
            "Send the content with a declared type this operation supports.".to_string(),
            false,
        ),
        FailureKind::DecodeError => (
            "The image may be damaged or in an unsupported encoding. JPEG, PNG and GIF are supported.".to_string(),
            false,
        ),
        FailureKind::EncodeError => (
            "Only JPEG, PNG and GIF previews can be produced.".to_string(),
            false,
        ),
        FailureKind::LimitExceeded => (
            "Request smaller max_width / max_height bounds.".to_string(),
            false,
        ),
        FailureKind::ToolInvocation => (
            match err.stage() {
                Some(stage) => format!(
                    "Check that the external tool for the {stage} stage is installed and the input is valid (`renderwerk doctor`)."
                ),
                None => "Check that the external tools are installed (`renderwerk doctor`).".to_string(),
            },
            false,
        ),
        FailureKind::MalformedDocument => (
            "The PDF is damaged beyond automatic repair. Try re-exporting it from the source application.".to_string(),
            false,
        ),
        FailureKind::DeadlineExceeded => (
            "Raise the request timeout or retry with a smaller document.".to_string(),
            true,
        ),
        FailureKind::Cancelled => ("The request was cancelled; resend it.".to_string(), true),
        FailureKind::Internal => (
            "Check the server logs and free disk space in the working directory.".to_string(),
            true,
        ),
    };

    HumanError {
        code: kind.code(),
        message: failure_message(operation, err),
        suggestion,
        retriable,
    }
}

/// The prefixed failure message for an error, e.g. `OCR failed, decrypt failed: ...`.
pub fn failure_message(operation: Operation, err: &RenderwerkError) -> String {
    format!("{}{}", operation.failure_prefix(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeclaredType, Stage};

    #[test]
    fn failure_prefix_never_matches_success() {
        for op in [Operation::Preview, Operation::Ocr] {
            assert!(!op.success_message().starts_with(op.failure_prefix()));
        }
    }

    #[test]
    fn ocr_failure_is_prefixed() {
        let err = RenderwerkError::tool(Stage::RunOcr, "ocrmypdf exited with 2");
        let human = humanize_error(Operation::Ocr, &err);
        assert_eq!(human.code, "tool-invocation");
        assert!(human.message.starts_with("OCR failed, "));
        assert!(human.message.contains("ocrmypdf exited with 2"));
        assert!(!human.retriable);
    }

    #[test]
    fn unsupported_type_code() {
        let err = RenderwerkError::UnsupportedType {
            declared: DeclaredType::Video,
            operation: "ocr",
        };
        let human = humanize_error(Operation::Ocr, &err);
        assert_eq!(human.code, "unsupported-type");
        assert_eq!(human.message, "OCR failed, unsupported file type video for ocr");
    }

    #[test]
    fn deadline_is_retriable() {
        let err = RenderwerkError::DeadlineExceeded {
            stage: Stage::FrameExtraction,
        };
        let human = humanize_error(Operation::Preview, &err);
        assert!(human.retriable);
        assert!(human.message.starts_with("Preview failed, "));
    }
}
