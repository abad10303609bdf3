// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-request call context: an optional deadline plus a cancellation token,
// threaded through every external capability call.

use std::future::Future;
use std::time::Duration;

use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::Stage;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Deadline and cancellation for one pipeline execution.
///
/// A context without a deadline waits indefinitely for external tools. That
/// matches the historical behaviour but lets a hung tool pin a worker, so
/// the server applies `default_timeout_secs` when a request brings none.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl CallContext {
    /// No deadline, never cancelled unless the token is triggered.
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => Self::with_timeout(timeout),
            None => Self::unbounded(),
        }
    }

    /// Replace the cancellation token, e.g. with a child of the server's
    /// shutdown token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail fast if the request is already cancelled or past its deadline.
    pub fn check(&self, stage: Stage) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RenderwerkError::Cancelled { stage });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(RenderwerkError::DeadlineExceeded { stage });
        }
        Ok(())
    }

    /// Run `work` until it finishes, the token is cancelled, or the deadline
    /// elapses. Losing the race drops `work`, which kills any child process
    /// spawned with `kill_on_drop`.
    pub async fn guard<T, F>(&self, stage: Stage, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(stage)?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(%stage, "call cancelled");
                Err(RenderwerkError::Cancelled { stage })
            }
            _ = wait_until(self.deadline) => {
                debug!(%stage, "call deadline elapsed");
                Err(RenderwerkError::DeadlineExceeded { stage })
            }
            result = work => result,
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_context_runs_to_completion() {
        let ctx = CallContext::unbounded();
        let value = ctx.guard(Stage::Extract, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_work() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let result: Result<()> = ctx
            .guard(Stage::RunOcr, async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(RenderwerkError::DeadlineExceeded { stage: Stage::RunOcr })
        ));
    }

    #[tokio::test]
    async fn cancellation_interrupts_work() {
        let ctx = CallContext::unbounded();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result: Result<()> = ctx
            .guard(Stage::Decrypt, std::future::pending())
            .await;
        assert!(matches!(
            result,
            Err(RenderwerkError::Cancelled { stage: Stage::Decrypt })
        ));
    }

    #[test]
    fn check_reports_cancellation_before_work_starts() {
        let ctx = CallContext::unbounded();
        ctx.cancel();
        assert!(matches!(
            ctx.check(Stage::Detect),
            Err(RenderwerkError::Cancelled { stage: Stage::Detect })
        ));
    }

    #[test]
    fn child_token_follows_parent() {
        let parent = CancellationToken::new();
        let ctx = CallContext::unbounded().with_cancellation(parent.child_token());
        parent.cancel();
        assert!(ctx.check(Stage::Extract).is_err());
    }
}
