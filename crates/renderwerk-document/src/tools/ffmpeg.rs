// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Video frame extraction via ffmpeg's `thumbnail` filter.

use std::path::Path;

use async_trait::async_trait;
use renderwerk_core::error::Result;
use renderwerk_core::types::Stage;

use super::FrameExtractor;
use super::command::ToolCommand;
use crate::context::CallContext;

pub const PROGRAM: &str = "ffmpeg";
pub const PACKAGE: &str = "ffmpeg";

pub struct Ffmpeg {
    program: String,
}

impl Ffmpeg {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, input: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(Stage::FrameExtraction, &self.program, PACKAGE)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-vf", "thumbnail", "-frames:v", "1"])
            .arg(output)
    }
}

#[async_trait]
impl FrameExtractor for Ffmpeg {
    async fn extract_frame(&self, input: &Path, output: &Path, ctx: &CallContext) -> Result<()> {
        self.command(input, output).run(ctx).await?.check()?;
        Ok(())
    }
}
