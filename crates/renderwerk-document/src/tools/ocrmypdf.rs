// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR text-layer burn-in via ocrmypdf.

use std::path::Path;

use async_trait::async_trait;
use renderwerk_core::config::OcrConfig;
use renderwerk_core::error::Result;
use renderwerk_core::types::Stage;

use super::OcrBurner;
use super::command::ToolCommand;
use crate::context::CallContext;

pub const PROGRAM: &str = "ocrmypdf";
pub const PACKAGE: &str = "ocrmypdf";

pub struct OcrMyPdf {
    program: String,
    language: Option<String>,
    skip_text: bool,
}

impl OcrMyPdf {
    pub fn new(program: impl Into<String>, config: &OcrConfig) -> Self {
        Self {
            program: program.into(),
            language: config.language.clone(),
            skip_text: config.skip_text,
        }
    }

    fn command(&self, input: &Path, output: &Path) -> ToolCommand {
        let mut command = ToolCommand::new(Stage::RunOcr, &self.program, PACKAGE);
        if self.skip_text {
            command = command.arg("--skip-text");
        }
        if let Some(language) = &self.language {
            command = command.arg("-l").arg(language);
        }
        command.arg(input).arg(output)
    }
}

#[async_trait]
impl OcrBurner for OcrMyPdf {
    async fn burn_in(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()> {
        self.command(input, output).run(ctx).await?.check()?;
        Ok(())
    }
}
