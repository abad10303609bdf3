// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Out-of-process tool invocation.

use std::ffi::{OsStr, OsString};
use std::process::Stdio;
use std::time::Instant;

use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::Stage;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::context::CallContext;

/// A single external program invocation attributed to a pipeline stage.
///
/// The child is spawned with `kill_on_drop`, so losing the race against the
/// call context's deadline or cancellation terminates it.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    stage: Stage,
    program: String,
    package: &'static str,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// `package` names what to install when `program` is missing.
    pub fn new(stage: Stage, program: impl Into<String>, package: &'static str) -> Self {
        Self {
            stage,
            program: program.into(),
            package,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion and capture its output. A non-zero exit is not an
    /// error here; callers classify exit codes.
    #[instrument(skip_all, fields(stage = %self.stage, program = %self.program))]
    pub async fn run(self, ctx: &CallContext) -> Result<ToolOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(args = ?self.args, "spawning tool");
        let started = Instant::now();
        let child = command.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                RenderwerkError::tool(
                    self.stage,
                    format!("{} not found (install {})", self.program, self.package),
                )
            } else {
                RenderwerkError::tool(self.stage, format!("failed to start {}: {}", self.program, err))
            }
        })?;

        let output = ctx
            .guard(self.stage, async {
                child.wait_with_output().await.map_err(|err| {
                    RenderwerkError::tool(self.stage, format!("{}: {}", self.program, err))
                })
            })
            .await?;

        debug!(
            code = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );
        Ok(ToolOutput {
            stage: self.stage,
            program: self.program,
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Captured result of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stage: Stage,
    pub program: String,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr followed by trimmed stdout.
    pub fn diagnostic(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stdout = String::from_utf8_lossy(&self.stdout);
        [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The `ToolInvocation` error describing this exit.
    pub fn failure(&self) -> RenderwerkError {
        let status = match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_string(),
        };
        let diagnostic = self.diagnostic();
        if diagnostic.is_empty() {
            RenderwerkError::tool(self.stage, format!("{} {}", self.program, status))
        } else {
            RenderwerkError::tool(self.stage, format!("{} {}: {}", self.program, status, diagnostic))
        }
    }

    /// Fail unless the exit status is 0.
    pub fn check(self) -> Result<Self> {
        if self.success() { Ok(self) } else { Err(self.failure()) }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn captures_output_and_status() {
        let output = ToolCommand::new(Stage::Extract, "sh", "coreutils")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run(&CallContext::unbounded())
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.diagnostic(), "err\nout");
        let err = output.check().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Extract));
        assert!(err.to_string().contains("exited with status 3"));
    }

    #[tokio::test]
    async fn missing_program_names_the_package() {
        let err = ToolCommand::new(Stage::RunOcr, "renderwerk-no-such-tool", "ocrmypdf")
            .run(&CallContext::unbounded())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RunOcr));
        assert!(err.to_string().contains("not found (install ocrmypdf)"));
    }

    #[tokio::test]
    async fn deadline_kills_a_hung_tool() {
        let ctx = CallContext::with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        let err = ToolCommand::new(Stage::Repair, "sleep", "coreutils")
            .arg("30")
            .run(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderwerkError::DeadlineExceeded { stage: Stage::Repair }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
