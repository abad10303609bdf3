// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request-scoped working areas.
//
// Every request gets its own uniquely named temporary directory. External
// tools read and write files inside it by path. The directory is removed when
// the owning handle drops, on success, error, and cancellation alike.

use std::path::{Path, PathBuf};

use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::{RequestId, Stage};
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

/// An exclusively owned temporary directory for one request.
pub struct WorkingArea {
    dir: Option<TempDir>,
    path: PathBuf,
    request_id: RequestId,
}

impl WorkingArea {
    /// Create a fresh directory named `renderwerk-<request-id>-<random>`
    /// under `parent` (or the system temp dir).
    #[instrument(skip_all, fields(request_id = %request_id))]
    pub fn create(parent: Option<&Path>, request_id: RequestId) -> Result<Self> {
        let prefix = format!("renderwerk-{request_id}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|err| {
                    RenderwerkError::Workspace(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        err
                    ))
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|err| RenderwerkError::Workspace(format!("failed to create working area: {err}")))?;

        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "working area created");
        Ok(Self {
            dir: Some(dir),
            path,
            request_id,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Path of a file inside the area. The file is not created.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `bytes` to a new file inside the area and return its path.
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            RenderwerkError::Workspace(format!("failed to write {}: {}", path.display(), err))
        })?;
        Ok(path)
    }

    /// Read a file a tool was expected to produce.
    pub async fn read_output(&self, path: &Path, stage: Stage) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(RenderwerkError::tool(
                stage,
                format!("tool reported success but wrote no output to {}", path.display()),
            )),
            Err(err) => Err(RenderwerkError::Workspace(format!(
                "failed to read {}: {}",
                path.display(),
                err
            ))),
        }
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!(
                    request_id = %self.request_id,
                    path = %self.path.display(),
                    "working area removed"
                ),
                Err(err) => warn!(
                    request_id = %self.request_id,
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove working area"
                ),
            }
        }
    }
}

/// A PDF held on disk inside a [`WorkingArea`], rewritten in place by
/// decrypt, OCR and repair steps.
///
/// Each rewrite goes through a scratch file: the tool reads [`path`](Self::path)
/// and writes [`scratch`](Self::scratch), then [`replace_with`](Self::replace_with)
/// renames the scratch file over the document.
pub struct WorkingDocument {
    area: WorkingArea,
    path: PathBuf,
    generation: u32,
}

impl WorkingDocument {
    const FILE_NAME: &'static str = "document.pdf";

    #[instrument(skip_all, fields(request_id = %request_id, bytes = content.len()))]
    pub async fn create(
        parent: Option<&Path>,
        request_id: RequestId,
        content: &[u8],
    ) -> Result<Self> {
        let area = WorkingArea::create(parent, request_id)?;
        let path = area.write_file(Self::FILE_NAME, content).await?;
        Ok(Self {
            area,
            path,
            generation: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn area(&self) -> &WorkingArea {
        &self.area
    }

    /// A fresh scratch path for the next rewrite step.
    pub fn scratch(&mut self, step: &str) -> PathBuf {
        self.generation += 1;
        self.area.file(&format!("{step}-{}.pdf", self.generation))
    }

    /// Replace the document with the contents of `scratch`.
    pub async fn replace_with(&mut self, scratch: &Path, stage: Stage) -> Result<()> {
        match tokio::fs::rename(scratch, &self.path).await {
            Ok(()) => {
                debug!(%stage, generation = self.generation, "document rewritten");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(RenderwerkError::tool(
                stage,
                format!("tool reported success but wrote no output to {}", scratch.display()),
            )),
            Err(err) => Err(RenderwerkError::Workspace(format!(
                "failed to replace document with {}: {}",
                scratch.display(),
                err
            ))),
        }
    }

    /// Current document bytes.
    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|err| {
            RenderwerkError::Workspace(format!("failed to read {}: {}", self.path.display(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let area = WorkingArea::create(Some(parent.path()), RequestId::new()).unwrap();
        let path = area.path().to_path_buf();
        assert!(path.is_dir());
        drop(area);
        assert!(!path.exists());
    }

    #[test]
    fn area_name_carries_request_id() {
        let id = RequestId::new();
        let area = WorkingArea::create(None, id).unwrap();
        let name = area.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("renderwerk-{id}-")));
    }

    #[test]
    fn areas_for_the_same_request_never_collide() {
        let id = RequestId::new();
        let a = WorkingArea::create(None, id).unwrap();
        let b = WorkingArea::create(None, id).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn document_rewrite_replaces_content() {
        let mut doc = WorkingDocument::create(None, RequestId::new(), b"%PDF-1.4 original")
            .await
            .unwrap();
        let scratch = doc.scratch("decrypt");
        tokio::fs::write(&scratch, b"%PDF-1.4 decrypted").await.unwrap();
        doc.replace_with(&scratch, Stage::Decrypt).await.unwrap();

        assert_eq!(doc.read().await.unwrap(), b"%PDF-1.4 decrypted");
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn missing_scratch_is_a_tool_error() {
        let mut doc = WorkingDocument::create(None, RequestId::new(), b"%PDF")
            .await
            .unwrap();
        let scratch = doc.scratch("ocr");
        let err = doc.replace_with(&scratch, Stage::RunOcr).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RunOcr));
    }

    #[tokio::test]
    async fn scratch_paths_are_distinct() {
        let mut doc = WorkingDocument::create(None, RequestId::new(), b"%PDF")
            .await
            .unwrap();
        let first = doc.scratch("repair");
        let second = doc.scratch("repair");
        assert_ne!(first, second);
        assert!(first.starts_with(doc.area().path()));
    }
}
