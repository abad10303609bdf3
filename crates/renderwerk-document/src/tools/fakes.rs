// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted in-process capabilities for pipeline tests. Every call is recorded
// so tests can assert which tools ran, in what order, and on which paths.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::Stage;

use super::*;

/// One scripted answer from the text extractor.
#[derive(Debug, Clone)]
pub(crate) enum TextReply {
    Text(String),
    Malformed,
    Fails,
}

#[derive(Default)]
pub(crate) struct FakeTools {
    calls: Mutex<Vec<&'static str>>,
    inputs: Mutex<Vec<PathBuf>>,
    heights: Mutex<Vec<u32>>,
    text_replies: Mutex<VecDeque<TextReply>>,
    encrypted: bool,
    frame: Vec<u8>,
    page: Vec<u8>,
    failing: Option<Stage>,
    delay: Option<Duration>,
}

impl FakeTools {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replies for successive `extract_text` calls. Once exhausted the
    /// extractor returns empty text.
    pub(crate) fn with_text(self, replies: impl IntoIterator<Item = TextReply>) -> Self {
        *self.text_replies.lock().unwrap() = replies.into_iter().collect();
        self
    }

    pub(crate) fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub(crate) fn with_frame(mut self, bytes: Vec<u8>) -> Self {
        self.frame = bytes;
        self
    }

    pub(crate) fn with_page(mut self, bytes: Vec<u8>) -> Self {
        self.page = bytes;
        self
    }

    /// Every capability attributed to `stage` fails with a tool error.
    pub(crate) fn failing_at(mut self, stage: Stage) -> Self {
        self.failing = Some(stage);
        self
    }

    /// Document rewrites sleep this long before producing output.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn toolchain(self: &Arc<Self>) -> Toolchain {
        Toolchain {
            frames: self.clone(),
            rasterizer: self.clone(),
            text: self.clone(),
            encryption: self.clone(),
            decryptor: self.clone(),
            repairer: self.clone(),
            ocr: self.clone(),
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| **call == name).count()
    }

    pub(crate) fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }

    pub(crate) fn heights(&self) -> Vec<u32> {
        self.heights.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str, stage: Stage, input: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(name);
        self.inputs.lock().unwrap().push(input.to_path_buf());
        if self.failing == Some(stage) {
            return Err(RenderwerkError::tool(stage, format!("fake {name} failure")));
        }
        Ok(())
    }

    async fn rewrite(
        &self,
        name: &'static str,
        stage: Stage,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        self.record(name, stage, input)?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut bytes = tokio::fs::read(input).await?;
        bytes.extend_from_slice(format!("\n%{name}").as_bytes());
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl FrameExtractor for FakeTools {
    async fn extract_frame(&self, input: &Path, output: &Path, _ctx: &CallContext) -> Result<()> {
        self.record("extract-frame", Stage::FrameExtraction, input)?;
        tokio::fs::write(output, &self.frame).await?;
        Ok(())
    }
}

#[async_trait]
impl PageRasterizer for FakeTools {
    async fn rasterize_first_page(
        &self,
        input: &Path,
        output: &Path,
        target_height: u32,
        _ctx: &CallContext,
    ) -> Result<()> {
        self.record("rasterize", Stage::PageRasterization, input)?;
        self.heights.lock().unwrap().push(target_height);
        tokio::fs::write(output, &self.page).await?;
        Ok(())
    }
}

#[async_trait]
impl TextExtractor for FakeTools {
    async fn extract_text(&self, input: &Path, stage: Stage, _ctx: &CallContext) -> Result<String> {
        self.record("extract-text", stage, input)?;
        let reply = self
            .text_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TextReply::Text(String::new()));
        match reply {
            TextReply::Text(text) => Ok(text),
            TextReply::Malformed => Err(RenderwerkError::malformed(stage, "xref table damaged")),
            TextReply::Fails => Err(RenderwerkError::tool(stage, "pdftotext crashed")),
        }
    }
}

#[async_trait]
impl EncryptionInspector for FakeTools {
    async fn is_encrypted(&self, input: &Path, _ctx: &CallContext) -> Result<bool> {
        self.record("is-encrypted", Stage::CheckEncrypted, input)?;
        Ok(self.encrypted)
    }
}

#[async_trait]
impl Decryptor for FakeTools {
    async fn decrypt(&self, input: &Path, output: &Path, _ctx: &CallContext) -> Result<()> {
        self.rewrite("decrypt", Stage::Decrypt, input, output).await
    }
}

#[async_trait]
impl Repairer for FakeTools {
    async fn repair(&self, input: &Path, output: &Path, _ctx: &CallContext) -> Result<()> {
        self.rewrite("repair", Stage::Repair, input, output).await
    }
}

#[async_trait]
impl OcrBurner for FakeTools {
    async fn burn_in(&self, input: &Path, output: &Path, _ctx: &CallContext) -> Result<()> {
        self.rewrite("burn-in", Stage::RunOcr, input, output).await
    }
}
