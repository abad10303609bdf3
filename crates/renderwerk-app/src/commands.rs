// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers.
//
// Pipeline failures are reported in their caller-facing form and turn into a
// failing exit code. Configuration and I/O problems propagate to `main`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use renderwerk_core::config::AppConfig;
use renderwerk_core::error::{RenderwerkError, Result};
use renderwerk_core::human_errors::{Operation, humanize_error};
use renderwerk_core::types::{DeclaredType, PreviewResult, ProcessingRequest};
use renderwerk_document::tools::required_programs;
use renderwerk_document::{CallContext, OcrPipeline, PreviewGenerator, Toolchain};
use renderwerk_server::{RenderServer, RenderService};
use tracing::{info, warn};

/// Settings shared by every subcommand after config, env and flags merge.
pub struct Session {
    pub config: AppConfig,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn toolchain(&self) -> Toolchain {
        Toolchain::system(&self.config.tools, &self.config.ocr)
    }

    /// A context carrying the configured deadline, cancelled on Ctrl-C.
    fn call_context(&self) -> CallContext {
        let ctx = CallContext::from_timeout(self.config.default_timeout());
        let interrupt = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                interrupt.cancel();
            }
        });
        ctx
    }
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

pub async fn serve(session: Session) -> Result<ExitCode> {
    let service = Arc::new(RenderService::new(&session.config, session.toolchain()));
    let mut server = RenderServer::new(&session.config.server, service);
    server.start().await?;
    println!(
        "renderwerk listening on {}:{}",
        session.config.server.bind_address,
        server.port()
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    server.stop().await?;
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// preview
// ---------------------------------------------------------------------------

pub async fn preview(
    session: Session,
    file: &Path,
    declared: Option<DeclaredType>,
    max_width: u32,
    max_height: u32,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let declared = resolve_type(file, declared)?;
    let request = ProcessingRequest::new(tokio::fs::read(file).await?, declared)
        .with_bounds(max_width, max_height);
    let generator = PreviewGenerator::new(
        session.toolchain(),
        session.config.work_dir.clone(),
        &session.config.preview,
    );

    match generator.generate_preview(&request, &session.call_context()).await {
        Ok(result) => {
            let path = write_preview(file, output, &result).await?;
            println!(
                "{} ({}x{}) -> {}",
                result.status_message,
                result.width,
                result.height,
                path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report(Operation::Preview, &err)),
    }
}

// ---------------------------------------------------------------------------
// ocr
// ---------------------------------------------------------------------------

pub async fn ocr(
    session: Session,
    file: &Path,
    clean_up: bool,
    output: Option<PathBuf>,
    document_out: Option<PathBuf>,
) -> Result<ExitCode> {
    let request = ProcessingRequest::new(tokio::fs::read(file).await?, DeclaredType::Pdf)
        .with_clean_up(clean_up);
    let pipeline = OcrPipeline::new(session.toolchain(), session.config.work_dir.clone());

    let result = match pipeline.run_ocr(&request, &session.call_context()).await {
        Ok(result) => result,
        Err(err) => return Ok(report(Operation::Ocr, &err)),
    };

    if let Some(path) = document_out {
        tokio::fs::write(&path, &result.raw_document).await?;
        info!(path = %path.display(), "processed document saved");
    }
    match output {
        Some(path) => {
            tokio::fs::write(&path, result.text.as_bytes()).await?;
            eprintln!("{} -> {}", result.status_message, path.display());
        }
        None => println!("{}", result.text),
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

/// Preview and OCR over the same file at once, each in its own working area.
pub async fn render(
    session: Session,
    file: &Path,
    max_width: u32,
    max_height: u32,
    clean_up: bool,
    preview_out: Option<PathBuf>,
) -> Result<ExitCode> {
    let declared = resolve_type(file, None)?;
    let content = tokio::fs::read(file).await?;
    let preview_request =
        ProcessingRequest::new(content.clone(), declared).with_bounds(max_width, max_height);
    let ocr_request = ProcessingRequest::new(content, declared).with_clean_up(clean_up);

    let tools = session.toolchain();
    let work_dir = session.config.work_dir.clone();
    let generator = PreviewGenerator::new(tools.clone(), work_dir.clone(), &session.config.preview);
    let pipeline = OcrPipeline::new(tools, work_dir);
    let ctx = session.call_context();

    let (preview, ocr) = tokio::join!(
        generator.generate_preview(&preview_request, &ctx),
        pipeline.run_ocr(&ocr_request, &ctx),
    );

    let mut failed = false;
    let preview_summary = match preview {
        Ok(result) => {
            let path = write_preview(file, preview_out, &result).await?;
            serde_json::json!({
                "message": result.status_message,
                "path": path.display().to_string(),
                "width": result.width,
                "height": result.height,
            })
        }
        Err(err) => {
            failed = true;
            failure_summary(Operation::Preview, &err)
        }
    };
    let ocr_summary = match ocr {
        Ok(result) => serde_json::json!({
            "message": result.status_message,
            "text": result.text,
            "ocr_applied": result.ocr_applied,
            "repaired": result.repaired,
            "page_count": result.page_count,
        }),
        Err(err) => {
            failed = true;
            failure_summary(Operation::Ocr, &err)
        }
    };

    let summary = serde_json::json!({ "preview": preview_summary, "ocr": ocr_summary });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

// ---------------------------------------------------------------------------
// doctor
// ---------------------------------------------------------------------------

pub fn doctor(session: Session) -> ExitCode {
    let mut missing = 0;
    for (program, package) in required_programs(&session.config.tools) {
        match which::which(program) {
            Ok(path) => println!("  ok       {program:<10} {}", path.display()),
            Err(_) => {
                missing += 1;
                println!("  missing  {program:<10} install {package}");
            }
        }
    }
    if missing == 0 {
        println!("All external tools found.");
        ExitCode::SUCCESS
    } else {
        println!("{missing} tool(s) missing.");
        ExitCode::FAILURE
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Apply `--work-dir` and `--timeout-secs` over the loaded configuration.
pub fn apply_overrides(
    mut config: AppConfig,
    work_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
) -> AppConfig {
    if work_dir.is_some() {
        config.work_dir = work_dir;
    }
    if let Some(secs) = timeout_secs {
        config.default_timeout_secs = (secs > 0).then_some(secs);
    }
    config
}

/// The declared type from the flag, or else from the file extension.
pub fn resolve_type(file: &Path, declared: Option<DeclaredType>) -> Result<DeclaredType> {
    if let Some(declared) = declared {
        return Ok(declared);
    }
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => Ok(DeclaredType::Pdf),
        "jpg" | "jpeg" | "png" | "gif" => Ok(DeclaredType::Image),
        "mp4" | "mov" | "mkv" | "webm" | "avi" | "m4v" => Ok(DeclaredType::Video),
        _ => Err(RenderwerkError::Config(format!(
            "cannot infer the type of {}; pass --type",
            file.display()
        ))),
    }
}

/// `<dir>/<stem>.preview.<ext>` for the preview of `input`.
pub fn default_preview_path(input: &Path, result: &PreviewResult) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    input.with_file_name(format!("{stem}.preview.{}", result.family.extension()))
}

async fn write_preview(
    input: &Path,
    output: Option<PathBuf>,
    result: &PreviewResult,
) -> Result<PathBuf> {
    let path = output.unwrap_or_else(|| default_preview_path(input, result));
    tokio::fs::write(&path, &result.image_bytes).await?;
    Ok(path)
}

fn report(operation: Operation, err: &RenderwerkError) -> ExitCode {
    let human = humanize_error(operation, err);
    eprintln!("{}", human.message);
    if let Some(diagnostic) = err.diagnostic() {
        eprintln!("  tool output: {diagnostic}");
    }
    eprintln!("  {}", human.suggestion);
    ExitCode::FAILURE
}

fn failure_summary(operation: Operation, err: &RenderwerkError) -> serde_json::Value {
    let human = humanize_error(operation, err);
    serde_json::json!({
        "code": human.code,
        "message": human.message,
        "stage": err.stage(),
        "suggestion": human.suggestion,
    })
}
