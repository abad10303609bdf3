// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for the external programs the pipelines depend on.
//
// Every capability works on files inside the request's working area and takes
// the request's `CallContext`, so a deadline or cancellation reaches the
// spawned process. The system implementations shell out to ffmpeg, poppler,
// qpdf and ocrmypdf.

pub mod command;
pub mod ffmpeg;
pub mod ocrmypdf;
pub mod poppler;
pub mod qpdf;

#[cfg(test)]
pub(crate) mod fakes;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use renderwerk_core::config::{OcrConfig, ToolConfig};
use renderwerk_core::error::Result;
use renderwerk_core::types::Stage;

use crate::context::CallContext;

pub use command::{ToolCommand, ToolOutput};

/// Pull one representative frame out of a video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write a JPEG frame of the video at `input` to `output`.
    async fn extract_frame(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()>;
}

/// Render the first page of a PDF.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Write page 1 of `input` as a JPEG to `output`, scaled to
    /// `target_height` pixels tall (0 keeps the native resolution).
    async fn rasterize_first_page(
        &self,
        input: &Path,
        output: &Path,
        target_height: u32,
        ctx: &CallContext,
    ) -> Result<()>;
}

/// Plain-text extraction. Also serves as the embedded-text probe.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract all text from `input`. Errors are attributed to `stage`; a
    /// structurally damaged document yields `MalformedDocument`.
    async fn extract_text(&self, input: &Path, stage: Stage, ctx: &CallContext) -> Result<String>;
}

#[async_trait]
pub trait EncryptionInspector: Send + Sync {
    async fn is_encrypted(&self, input: &Path, ctx: &CallContext) -> Result<bool>;
}

#[async_trait]
pub trait Decryptor: Send + Sync {
    async fn decrypt(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()>;
}

/// Rebuild a damaged PDF's cross-reference structure.
#[async_trait]
pub trait Repairer: Send + Sync {
    async fn repair(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()>;
}

/// Burn an OCR text layer into a scanned PDF.
#[async_trait]
pub trait OcrBurner: Send + Sync {
    async fn burn_in(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()>;
}

/// The full set of capabilities, shared between pipelines and requests.
#[derive(Clone)]
pub struct Toolchain {
    pub frames: Arc<dyn FrameExtractor>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub text: Arc<dyn TextExtractor>,
    pub encryption: Arc<dyn EncryptionInspector>,
    pub decryptor: Arc<dyn Decryptor>,
    pub repairer: Arc<dyn Repairer>,
    pub ocr: Arc<dyn OcrBurner>,
}

impl Toolchain {
    /// Command-line implementations using the configured program names.
    pub fn system(tools: &ToolConfig, ocr: &OcrConfig) -> Self {
        let qpdf = Arc::new(qpdf::Qpdf::new(&tools.qpdf));
        Self {
            frames: Arc::new(ffmpeg::Ffmpeg::new(&tools.ffmpeg)),
            rasterizer: Arc::new(poppler::Pdftoppm::new(&tools.pdftoppm)),
            text: Arc::new(poppler::Pdftotext::new(&tools.pdftotext)),
            encryption: qpdf.clone(),
            decryptor: qpdf.clone(),
            repairer: qpdf,
            ocr: Arc::new(ocrmypdf::OcrMyPdf::new(&tools.ocrmypdf, ocr)),
        }
    }
}

/// Configured program names with the package that provides each.
pub fn required_programs(tools: &ToolConfig) -> Vec<(&str, &'static str)> {
    vec![
        (tools.ffmpeg.as_str(), ffmpeg::PACKAGE),
        (tools.pdftoppm.as_str(), poppler::PACKAGE),
        (tools.pdftotext.as_str(), poppler::PACKAGE),
        (tools.qpdf.as_str(), qpdf::PACKAGE),
        (tools.ocrmypdf.as_str(), ocrmypdf::PACKAGE),
    ]
}
