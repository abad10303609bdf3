// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR pipeline state machine.
//
//   DETECT ──text──────────────────────────────┐
//     └─no text─> CHECK_ENCRYPTED ─> [DECRYPT] ─> RUN_OCR ─> EXTRACT
//   EXTRACT ─ok─> [CLEAN] ─> DONE
//           └─malformed (first time)─> REPAIR ─> EXTRACT
//
// Every other failure is terminal. The document lives in a request-scoped
// working area that is removed however the run ends.

use std::path::PathBuf;

use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::{DeclaredType, OCR_SUCCESS_MESSAGE, OcrResult, ProcessingRequest, Stage};
use tracing::{debug, info, instrument, warn};

use super::cleaner::clean_text;
use super::detector::has_embedded_text;
use crate::context::CallContext;
use crate::pdf::reader::count_pages;
use crate::tools::Toolchain;
use crate::workspace::WorkingDocument;

enum PipelineState {
    Detect,
    CheckEncrypted,
    Decrypt,
    RunOcr,
    Extract,
    Repair,
    Clean(String),
    Done(String),
}

impl PipelineState {
    fn name(&self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::CheckEncrypted => "check-encrypted",
            Self::Decrypt => "decrypt",
            Self::RunOcr => "run-ocr",
            Self::Extract => "extract",
            Self::Repair => "repair",
            Self::Clean(_) => "clean",
            Self::Done(_) => "done",
        }
    }
}

/// Turns PDFs into text, running OCR only when the document has no text
/// layer of its own.
pub struct OcrPipeline {
    tools: Toolchain,
    work_dir: Option<PathBuf>,
}

impl OcrPipeline {
    pub fn new(tools: Toolchain, work_dir: Option<PathBuf>) -> Self {
        Self { tools, work_dir }
    }

    #[instrument(skip_all, fields(request_id = %request.id, clean_up = request.clean_up))]
    pub async fn run_ocr(&self, request: &ProcessingRequest, ctx: &CallContext) -> Result<OcrResult> {
        if request.declared_type != DeclaredType::Pdf {
            return Err(RenderwerkError::UnsupportedType {
                declared: request.declared_type,
                operation: "ocr",
            });
        }
        ctx.check(Stage::Dispatch)?;
        let started = std::time::Instant::now();
        info!(
            bytes = request.content.len(),
            digest = %request.content_digest(),
            "starting OCR pipeline"
        );

        let mut document =
            WorkingDocument::create(self.work_dir.as_deref(), request.id, &request.content).await?;
        let mut ocr_applied = false;
        let mut repaired = false;
        let mut state = PipelineState::Detect;

        let text = loop {
            debug!(state = state.name(), "pipeline step");
            state = match state {
                PipelineState::Detect => {
                    if has_embedded_text(self.tools.text.as_ref(), document.path(), ctx).await? {
                        PipelineState::Extract
                    } else {
                        PipelineState::CheckEncrypted
                    }
                }
                PipelineState::CheckEncrypted => {
                    let encrypted = ctx
                        .guard(
                            Stage::CheckEncrypted,
                            self.tools.encryption.is_encrypted(document.path(), ctx),
                        )
                        .await?;
                    debug!(encrypted, "encryption checked");
                    if encrypted {
                        PipelineState::Decrypt
                    } else {
                        PipelineState::RunOcr
                    }
                }
                PipelineState::Decrypt => {
                    let scratch = document.scratch("decrypt");
                    ctx.guard(
                        Stage::Decrypt,
                        self.tools.decryptor.decrypt(document.path(), &scratch, ctx),
                    )
                    .await?;
                    document.replace_with(&scratch, Stage::Decrypt).await?;
                    PipelineState::RunOcr
                }
                PipelineState::RunOcr => {
                    let scratch = document.scratch("ocr");
                    ctx.guard(
                        Stage::RunOcr,
                        self.tools.ocr.burn_in(document.path(), &scratch, ctx),
                    )
                    .await?;
                    document.replace_with(&scratch, Stage::RunOcr).await?;
                    ocr_applied = true;
                    PipelineState::Extract
                }
                PipelineState::Extract => {
                    let extracted = ctx
                        .guard(
                            Stage::Extract,
                            self.tools.text.extract_text(document.path(), Stage::Extract, ctx),
                        )
                        .await;
                    match extracted {
                        Ok(text) if request.clean_up => PipelineState::Clean(text),
                        Ok(text) => PipelineState::Done(text),
                        Err(err) if err.is_malformed_document() && !repaired => {
                            warn!(error = %err, "extraction hit a malformed document, repairing");
                            PipelineState::Repair
                        }
                        Err(err) => return Err(err),
                    }
                }
                PipelineState::Repair => {
                    let scratch = document.scratch("repair");
                    ctx.guard(
                        Stage::Repair,
                        self.tools.repairer.repair(document.path(), &scratch, ctx),
                    )
                    .await?;
                    document.replace_with(&scratch, Stage::Repair).await?;
                    repaired = true;
                    PipelineState::Extract
                }
                PipelineState::Clean(text) => PipelineState::Done(clean_text(&text)),
                PipelineState::Done(text) => break text,
            };
        };

        let raw_document = document.read().await?;
        let page_count = count_pages(&raw_document);
        info!(
            chars = text.len(),
            ocr_applied,
            repaired,
            page_count = ?page_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OCR pipeline finished"
        );
        Ok(OcrResult {
            text,
            raw_document,
            status_message: OCR_SUCCESS_MESSAGE.to_string(),
            ocr_applied,
            repaired,
            page_count,
        })
    }
}
