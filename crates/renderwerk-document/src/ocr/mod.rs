// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR module: embedded-text detection, the OCR pipeline state machine, and
// the OCR noise filter.

pub mod cleaner;
pub mod detector;
pub mod pipeline;

pub use cleaner::clean_text;
pub use detector::has_embedded_text;
pub use pipeline::OcrPipeline;
