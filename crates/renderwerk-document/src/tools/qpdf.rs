// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qpdf: encryption inspection, decryption and structural repair.
//
// Rewriting a file through qpdf rebuilds a damaged cross-reference table,
// which is all the repair step needs.

use std::path::Path;

use async_trait::async_trait;
use renderwerk_core::error::Result;
use renderwerk_core::types::Stage;
use tracing::warn;

use super::command::{ToolCommand, ToolOutput};
use super::{Decryptor, EncryptionInspector, Repairer};
use crate::context::CallContext;

pub const PROGRAM: &str = "qpdf";
pub const PACKAGE: &str = "qpdf";

/// Exit status for "succeeded with warnings".
const EXIT_WARNINGS: i32 = 3;
/// `--is-encrypted` exit status for an unencrypted file.
const EXIT_NOT_ENCRYPTED: i32 = 2;

pub struct Qpdf {
    program: String,
}

impl Qpdf {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, stage: Stage) -> ToolCommand {
        ToolCommand::new(stage, &self.program, PACKAGE)
    }
}

/// Accept a clean exit or an exit with warnings.
fn accept_warnings(output: ToolOutput) -> Result<()> {
    match output.code {
        Some(0) => Ok(()),
        Some(EXIT_WARNINGS) => {
            warn!(
                stage = %output.stage,
                diagnostic = %output.diagnostic(),
                "qpdf finished with warnings"
            );
            Ok(())
        }
        _ => Err(output.failure()),
    }
}

#[async_trait]
impl EncryptionInspector for Qpdf {
    async fn is_encrypted(&self, input: &Path, ctx: &CallContext) -> Result<bool> {
        let output = self
            .command(Stage::CheckEncrypted)
            .arg("--is-encrypted")
            .arg(input)
            .run(ctx)
            .await?;
        match output.code {
            Some(0) => Ok(true),
            Some(EXIT_NOT_ENCRYPTED) => Ok(false),
            _ => Err(output.failure()),
        }
    }
}

#[async_trait]
impl Decryptor for Qpdf {
    async fn decrypt(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()> {
        let result = self
            .command(Stage::Decrypt)
            .arg("--decrypt")
            .arg(input)
            .arg(output)
            .run(ctx)
            .await?;
        accept_warnings(result)
    }
}

#[async_trait]
impl Repairer for Qpdf {
    async fn repair(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()> {
        let result = self
            .command(Stage::Repair)
            .arg(input)
            .arg(output)
            .run(ctx)
            .await?;
        accept_warnings(result)
    }
}
