// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-document detection.

use std::path::Path;

use renderwerk_core::error::Result;
use renderwerk_core::types::Stage;
use tracing::debug;

use crate::context::CallContext;
use crate::tools::TextExtractor;

/// Whether the PDF at `document` already carries extractable text.
///
/// A probe extraction returning only whitespace means "scanned". Extraction
/// errors are returned as errors, never as `false`.
pub async fn has_embedded_text(
    extractor: &dyn TextExtractor,
    document: &Path,
    ctx: &CallContext,
) -> Result<bool> {
    let text = ctx
        .guard(Stage::Detect, extractor.extract_text(document, Stage::Detect, ctx))
        .await?;
    let found = !text.trim().is_empty();
    debug!(found, probe_chars = text.len(), "embedded text probe");
    Ok(found)
}
