// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: inspect finished documents with the `lopdf` crate.

use lopdf::Document;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::Stage;
use tracing::{debug, instrument};

/// Read-only view of a PDF held in memory.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Parse raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            RenderwerkError::malformed(Stage::Extract, format!("failed to parse PDF: {}", err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}

/// Page count of `data`, or `None` when it does not parse in-process.
///
/// External tools tolerate damage that lopdf rejects, so a document that
/// extracted fine may still land here as `None`.
pub fn count_pages(data: &[u8]) -> Option<usize> {
    match PdfReader::from_bytes(data) {
        Ok(reader) => Some(reader.page_count()),
        Err(err) => {
            debug!(error = %err, "page count unavailable");
            None
        }
    }
}
