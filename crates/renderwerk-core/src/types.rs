// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Renderwerk preview and OCR pipelines.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Unique identifier for a single processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-asserted content category. Drives pipeline selection; the content
/// itself is never sniffed to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Image,
    Video,
    Pdf,
}

impl DeclaredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Pdf => "pdf",
        }
    }

    /// Parse a declared type from a transport-level keyword.
    ///
    /// Accepts the lowercase names and the upper-case enum spellings used by
    /// older clients (`IMAGE`, `VIDEO`, `PDF`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Routing a request to a pipeline.
    Dispatch,
    /// Creating or tearing down the request's working area.
    Workspace,
    /// Single-frame extraction from a video.
    FrameExtraction,
    /// First-page rasterization of a PDF.
    PageRasterization,
    /// Raster decode.
    Decode,
    /// Raster encode.
    Encode,
    /// Embedded-text probe.
    Detect,
    /// Encryption inspection.
    CheckEncrypted,
    Decrypt,
    /// OCR text-layer burn-in.
    RunOcr,
    /// Final plain-text extraction.
    Extract,
    Repair,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::Workspace => "workspace",
            Self::FrameExtraction => "frame-extraction",
            Self::PageRasterization => "page-rasterization",
            Self::Decode => "decode",
            Self::Encode => "encode",
            Self::Detect => "detect",
            Self::CheckEncrypted => "check-encrypted",
            Self::Decrypt => "decrypt",
            Self::RunOcr => "run-ocr",
            Self::Extract => "extract",
            Self::Repair => "repair",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raster encoding family. A resized preview is always re-encoded in the
/// family it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFamily {
    Jpeg,
    Png,
    Gif,
}

impl EncodingFamily {
    /// MIME type string for the transport's `Content-Type`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

/// An inbound request. Immutable once received.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub id: RequestId,
    pub content: Vec<u8>,
    pub declared_type: DeclaredType,
    /// 0 means no constraint on this axis.
    pub max_width: u32,
    /// 0 means no constraint on this axis.
    pub max_height: u32,
    /// Run the text cleaner over extracted text (OCR path only).
    pub clean_up: bool,
}

impl ProcessingRequest {
    pub fn new(content: Vec<u8>, declared_type: DeclaredType) -> Self {
        Self {
            id: RequestId::new(),
            content,
            declared_type,
            max_width: 0,
            max_height: 0,
            clean_up: false,
        }
    }

    pub fn with_bounds(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_clean_up(mut self, clean_up: bool) -> Self {
        self.clean_up = clean_up;
        self
    }

    /// Hex-encoded SHA-256 of the request content, for log correlation.
    pub fn content_digest(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }
}

/// Outcome of a successful preview generation.
#[derive(Debug, Clone)]
pub struct PreviewResult {
    pub image_bytes: Vec<u8>,
    pub status_message: String,
    pub family: EncodingFamily,
    pub width: u32,
    pub height: u32,
}

/// Outcome of a successful OCR run.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    /// The PDF after any decrypt / burn-in / repair steps.
    pub raw_document: Vec<u8>,
    pub status_message: String,
    /// Whether the OCR burn-in tool ran.
    pub ocr_applied: bool,
    /// Whether the repair branch ran.
    pub repaired: bool,
    /// Page count of the final document, when it parses in-process.
    pub page_count: Option<usize>,
}

/// Success messages returned to callers. Failure messages use the prefixes in
/// [`crate::human_errors`].
pub const PREVIEW_SUCCESS_MESSAGE: &str = "Thumbnail generated successfully";
pub const OCR_SUCCESS_MESSAGE: &str = "OCR success";

/// Lifecycle state of the render server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}
