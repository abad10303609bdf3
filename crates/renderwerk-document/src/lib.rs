// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// renderwerk-document: The content-processing core.
//
// Provides preview generation (image / video frame / PDF first page, resized
// with an aspect-preserving policy) and the OCR pipeline (embedded-text
// detection, conditional decrypt, OCR burn-in, extraction with one repair
// retry, and text cleaning). External programs are reached through the
// capability traits in `tools`.

pub mod context;
pub mod ocr;
pub mod pdf;
pub mod preview;
pub mod raster;
pub mod tools;
pub mod workspace;

pub use context::CallContext;
pub use ocr::pipeline::OcrPipeline;
pub use preview::PreviewGenerator;
pub use raster::processor::ImageProcessor;
pub use tools::Toolchain;
pub use workspace::{WorkingArea, WorkingDocument};
