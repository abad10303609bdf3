// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Poppler utilities: `pdftoppm` for first-page rasterization and `pdftotext`
// for text extraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::Stage;
use tracing::debug;

use super::command::{ToolCommand, ToolOutput};
use super::{PageRasterizer, TextExtractor};
use crate::context::CallContext;

pub const PDFTOPPM: &str = "pdftoppm";
pub const PDFTOTEXT: &str = "pdftotext";
pub const PACKAGE: &str = "poppler-utils";

/// pdftotext exit status for "error opening a PDF file". Exit 3
/// (permissions) is a plain tool failure: a qpdf rewrite keeps the encryption.
const EXIT_OPEN_ERROR: i32 = 1;

pub struct Pdftoppm {
    program: String,
}

impl Pdftoppm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl PageRasterizer for Pdftoppm {
    async fn rasterize_first_page(
        &self,
        input: &Path,
        output: &Path,
        target_height: u32,
        ctx: &CallContext,
    ) -> Result<()> {
        // pdftoppm appends the extension to the prefix it is given.
        let prefix = output.with_extension("");
        let produced = prefix.with_extension("jpg");

        let mut command = ToolCommand::new(Stage::PageRasterization, &self.program, PACKAGE)
            .args(["-jpeg", "-singlefile", "-f", "1", "-l", "1"]);
        if target_height > 0 {
            command = command
                .args(["-scale-to-x", "-1", "-scale-to-y"])
                .arg(target_height.to_string());
        }
        command.arg(input).arg(&prefix).run(ctx).await?.check()?;

        if produced != output {
            tokio::fs::rename(&produced, output).await.map_err(|err| {
                RenderwerkError::tool(
                    Stage::PageRasterization,
                    format!("{} wrote no page image: {}", self.program, err),
                )
            })?;
        }
        Ok(())
    }
}

pub struct Pdftotext {
    program: String,
}

impl Pdftotext {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn text_path(input: &Path, stage: Stage) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        input.with_file_name(format!("{stem}-{stage}.txt"))
    }
}

#[async_trait]
impl TextExtractor for Pdftotext {
    async fn extract_text(&self, input: &Path, stage: Stage, ctx: &CallContext) -> Result<String> {
        let text_path = Self::text_path(input, stage);
        let output = ToolCommand::new(stage, &self.program, PACKAGE)
            .args(["-enc", "UTF-8"])
            .arg(input)
            .arg(&text_path)
            .run(ctx)
            .await?;

        classify_exit(output)?;

        let bytes = tokio::fs::read(&text_path).await.map_err(|err| {
            RenderwerkError::tool(stage, format!("{} wrote no text: {}", self.program, err))
        })?;
        if let Err(err) = tokio::fs::remove_file(&text_path).await {
            debug!(path = %text_path.display(), error = %err, "text file left for area cleanup");
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Only a failure to open the document is worth a repair attempt.
fn classify_exit(output: ToolOutput) -> Result<()> {
    match output.code {
        Some(0) => Ok(()),
        Some(EXIT_OPEN_ERROR) => Err(RenderwerkError::malformed(output.stage, output.diagnostic())),
        _ => Err(output.failure()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: Option<i32>) -> ToolOutput {
        ToolOutput {
            stage: Stage::Extract,
            program: PDFTOTEXT.into(),
            code,
            stdout: Vec::new(),
            stderr: b"Syntax Error: Couldn't read xref table".to_vec(),
        }
    }

    #[test]
    fn open_error_is_malformed() {
        let err = classify_exit(output(Some(EXIT_OPEN_ERROR))).unwrap_err();
        assert!(err.is_malformed_document());
        assert_eq!(err.stage(), Some(Stage::Extract));
        assert_eq!(err.diagnostic(), Some("Syntax Error: Couldn't read xref table"));
    }

    #[test]
    fn permission_error_is_not_repairable() {
        let err = classify_exit(output(Some(3))).unwrap_err();
        assert!(!err.is_malformed_document());
        assert_eq!(err.stage(), Some(Stage::Extract));
        assert!(classify_exit(output(None)).is_err());
        assert!(classify_exit(output(Some(0))).is_ok());
    }

    #[test]
    fn text_path_is_per_stage() {
        let input = Path::new("/tmp/area/document.pdf");
        assert_eq!(
            Pdftotext::text_path(input, Stage::Detect),
            PathBuf::from("/tmp/area/document-detect.txt")
        );
        assert_eq!(
            Pdftotext::text_path(input, Stage::Extract),
            PathBuf::from("/tmp/area/document-extract.txt")
        );
    }
}
