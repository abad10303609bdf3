// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preview generation.
//
// Routes content by declared type to one of three raster sources (the image
// itself, one video frame, or the first PDF page), then applies the resize
// policy. Transient files live in a per-request working area that is removed
// on every exit path.

use std::path::PathBuf;

use renderwerk_core::config::PreviewConfig;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::types::{
    DeclaredType, PREVIEW_SUCCESS_MESSAGE, PreviewResult, ProcessingRequest, Stage,
};
use tracing::{info, instrument};

use crate::context::CallContext;
use crate::raster::resize_raster;
use crate::tools::Toolchain;
use crate::workspace::WorkingArea;

pub struct PreviewGenerator {
    tools: Toolchain,
    work_dir: Option<PathBuf>,
    config: PreviewConfig,
}

impl PreviewGenerator {
    pub fn new(tools: Toolchain, work_dir: Option<PathBuf>, config: &PreviewConfig) -> Self {
        Self {
            tools,
            work_dir,
            config: config.clone(),
        }
    }

    /// Produce a bounded-size preview of `request.content`.
    #[instrument(
        skip_all,
        fields(
            request_id = %request.id,
            declared = %request.declared_type,
            max_width = request.max_width,
            max_height = request.max_height,
        )
    )]
    pub async fn generate_preview(
        &self,
        request: &ProcessingRequest,
        ctx: &CallContext,
    ) -> Result<PreviewResult> {
        ctx.check(Stage::Dispatch)?;
        let started = std::time::Instant::now();
        info!(
            bytes = request.content.len(),
            digest = %request.content_digest(),
            "generating preview"
        );

        let raster = match request.declared_type {
            DeclaredType::Image => request.content.clone(),
            DeclaredType::Video => self.video_frame(request, ctx).await?,
            DeclaredType::Pdf => self.first_page(request, ctx).await?,
        };

        let (max_width, max_height, config) =
            (request.max_width, request.max_height, self.config.clone());
        let resized = ctx
            .guard(Stage::Decode, async move {
                tokio::task::spawn_blocking(move || {
                    resize_raster(raster, max_width, max_height, &config)
                })
                .await
                .map_err(|err| RenderwerkError::Io(std::io::Error::other(err)))?
            })
            .await?;

        info!(
            width = resized.width,
            height = resized.height,
            family = ?resized.family,
            bytes = resized.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "preview generated"
        );
        Ok(PreviewResult {
            image_bytes: resized.bytes,
            status_message: PREVIEW_SUCCESS_MESSAGE.to_string(),
            family: resized.family,
            width: resized.width,
            height: resized.height,
        })
    }

    async fn video_frame(&self, request: &ProcessingRequest, ctx: &CallContext) -> Result<Vec<u8>> {
        let area = WorkingArea::create(self.work_dir.as_deref(), request.id)?;
        let input = area.write_file("input.video", &request.content).await?;
        let output = area.file("frame.jpg");
        ctx.guard(
            Stage::FrameExtraction,
            self.tools.frames.extract_frame(&input, &output, ctx),
        )
        .await?;
        area.read_output(&output, Stage::FrameExtraction).await
    }

    async fn first_page(&self, request: &ProcessingRequest, ctx: &CallContext) -> Result<Vec<u8>> {
        let area = WorkingArea::create(self.work_dir.as_deref(), request.id)?;
        let input = area.write_file("input.pdf", &request.content).await?;
        let output = area.file("page.jpg");
        ctx.guard(
            Stage::PageRasterization,
            self.tools
                .rasterizer
                .rasterize_first_page(&input, &output, request.max_height, ctx),
        )
        .await?;
        area.read_output(&output, Stage::PageRasterization).await
    }
}
