// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request routing: HTTP requests in, pipeline results out.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use renderwerk_core::config::AppConfig;
use renderwerk_core::error::{FailureKind, RenderwerkError, Result};
use renderwerk_core::human_errors::{Operation, humanize_error};
use renderwerk_core::types::{DeclaredType, ProcessingRequest, RequestId, Stage};
use renderwerk_document::{CallContext, OcrPipeline, PreviewGenerator, Toolchain};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::http::{HttpRequest, HttpResponse};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    stage: Option<Stage>,
    message: String,
    diagnostic: Option<String>,
    suggestion: String,
    retriable: bool,
    request_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OcrBody {
    message: String,
    text: String,
    /// Base64 of the processed PDF.
    document: String,
    ocr_applied: bool,
    repaired: bool,
    page_count: Option<usize>,
    request_id: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    in_flight: usize,
    max_in_flight: usize,
}

/// HTTP status for a failure class.
pub fn status_for(kind: FailureKind) -> u16 {
    match kind {
        FailureKind::UnsupportedType | FailureKind::LimitExceeded => 400,
        FailureKind::DecodeError | FailureKind::EncodeError | FailureKind::MalformedDocument => 422,
        FailureKind::ToolInvocation => 502,
        FailureKind::DeadlineExceeded => 504,
        FailureKind::Cancelled => 503,
        FailureKind::Internal => 500,
    }
}

/// JSON error for a transport-level problem that never reached a pipeline.
pub fn client_error(status: u16, code: &'static str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::json(
        status,
        &ErrorBody {
            code,
            stage: None,
            message: message.into(),
            diagnostic: None,
            suggestion: String::new(),
            retriable: false,
            request_id: None,
        },
    )
}

fn pipeline_error(operation: Operation, id: RequestId, err: &RenderwerkError) -> HttpResponse {
    let human = humanize_error(operation, err);
    HttpResponse::json(
        status_for(err.kind()),
        &ErrorBody {
            code: human.code,
            stage: err.stage(),
            message: human.message,
            diagnostic: err.diagnostic().map(str::to_string),
            suggestion: human.suggestion,
            retriable: human.retriable,
            request_id: Some(id.to_string()),
        },
    )
    .with_header("X-Request-Id", id.to_string())
}

// ---------------------------------------------------------------------------
// RenderService
// ---------------------------------------------------------------------------

/// Routes requests to the preview and OCR pipelines.
pub struct RenderService {
    preview: PreviewGenerator,
    ocr: OcrPipeline,
    default_timeout: Option<Duration>,
    limiter: Semaphore,
    max_in_flight: usize,
}

impl RenderService {
    pub fn new(config: &AppConfig, tools: Toolchain) -> Self {
        let max_in_flight = config.server.max_concurrent_requests.max(1);
        Self {
            preview: PreviewGenerator::new(tools.clone(), config.work_dir.clone(), &config.preview),
            ocr: OcrPipeline::new(tools, config.work_dir.clone()),
            default_timeout: config.default_timeout(),
            limiter: Semaphore::new(max_in_flight),
            max_in_flight,
        }
    }

    /// Handle one request. `shutdown` is the server's token; pipelines run
    /// under a child of it.
    #[instrument(skip_all, fields(method = %request.head.method, path = %request.head.path))]
    pub async fn handle(&self, request: HttpRequest, shutdown: &CancellationToken) -> HttpResponse {
        match (request.head.method.as_str(), request.head.path.as_str()) {
            ("GET", "/health") => self.health(),
            ("POST", "/preview") => self.preview(request, shutdown).await,
            ("POST", "/ocr") => self.ocr(request, shutdown).await,
            (_, "/health" | "/preview" | "/ocr") => {
                client_error(405, "method-not-allowed", "method not allowed for this route")
            }
            (_, path) => client_error(404, "not-found", format!("no route for {path}")),
        }
    }

    fn health(&self) -> HttpResponse {
        HttpResponse::json(
            200,
            &HealthBody {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                in_flight: self.max_in_flight - self.limiter.available_permits(),
                max_in_flight: self.max_in_flight,
            },
        )
    }

    async fn preview(&self, request: HttpRequest, shutdown: &CancellationToken) -> HttpResponse {
        let parsed = match parse_processing_request(request) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        let id = parsed.request.id;
        let ctx = self.call_context(parsed.timeout, shutdown);

        let outcome = self
            .run_limited(&ctx, self.preview.generate_preview(&parsed.request, &ctx))
            .await;
        match outcome {
            Ok(result) => {
                info!(request_id = %id, bytes = result.image_bytes.len(), "preview served");
                HttpResponse::new(200, result.family.mime_type(), result.image_bytes)
                    .with_header("X-Status-Message", result.status_message)
                    .with_header("X-Request-Id", id.to_string())
                    .with_header("X-Preview-Width", result.width.to_string())
                    .with_header("X-Preview-Height", result.height.to_string())
            }
            Err(err) => {
                warn!(request_id = %id, error = %err, "preview failed");
                pipeline_error(Operation::Preview, id, &err)
            }
        }
    }

    async fn ocr(&self, request: HttpRequest, shutdown: &CancellationToken) -> HttpResponse {
        let parsed = match parse_processing_request(request) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        let id = parsed.request.id;
        let ctx = self.call_context(parsed.timeout, shutdown);

        let outcome = self
            .run_limited(&ctx, self.ocr.run_ocr(&parsed.request, &ctx))
            .await;
        match outcome {
            Ok(result) => {
                info!(request_id = %id, chars = result.text.len(), "OCR served");
                HttpResponse::json(
                    200,
                    &OcrBody {
                        message: result.status_message,
                        text: result.text,
                        document: BASE64.encode(&result.raw_document),
                        ocr_applied: result.ocr_applied,
                        repaired: result.repaired,
                        page_count: result.page_count,
                        request_id: id.to_string(),
                    },
                )
                .with_header("X-Request-Id", id.to_string())
            }
            Err(err) => {
                warn!(request_id = %id, error = %err, "OCR failed");
                pipeline_error(Operation::Ocr, id, &err)
            }
        }
    }

    fn call_context(&self, timeout: Option<Duration>, shutdown: &CancellationToken) -> CallContext {
        CallContext::from_timeout(timeout.or(self.default_timeout))
            .with_cancellation(shutdown.child_token())
    }

    /// Wait for a pipeline slot, then run `work`. Waiting counts against the
    /// request's deadline.
    async fn run_limited<T>(
        &self,
        ctx: &CallContext,
        work: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let _permit = ctx
            .guard(Stage::Dispatch, async {
                self.limiter
                    .acquire()
                    .await
                    .map_err(|_| RenderwerkError::Server("request limiter closed".into()))
            })
            .await?;
        work.await
    }
}

struct ParsedRequest {
    request: ProcessingRequest,
    timeout: Option<Duration>,
}

/// Build a `ProcessingRequest` from query parameters and the body.
fn parse_processing_request(request: HttpRequest) -> std::result::Result<ParsedRequest, HttpResponse> {
    let head = &request.head;
    let declared = match head.query_param("type") {
        None => return Err(client_error(400, "bad-request", "missing `type` query parameter")),
        Some(value) => DeclaredType::parse(value).ok_or_else(|| {
            client_error(400, "unsupported-type", format!("unsupported file type {value}"))
        })?,
    };
    let max_width = numeric_param(head.query_param("max_width"), "max_width")?;
    let max_height = numeric_param(head.query_param("max_height"), "max_height")?;
    let clean_up = match head.query_param("clean_up") {
        None => false,
        Some(value) => parse_flag(value).ok_or_else(|| {
            client_error(400, "bad-request", format!("clean_up must be true or false, got {value}"))
        })?,
    };
    let timeout_ms: u64 = numeric_param(
        head.header("x-timeout-ms").or_else(|| head.query_param("timeout_ms")),
        "timeout",
    )?;
    let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

    let processing = ProcessingRequest::new(request.body, declared)
        .with_bounds(max_width, max_height)
        .with_clean_up(clean_up);
    Ok(ParsedRequest {
        request: processing,
        timeout,
    })
}

/// Absent parameters are 0.
fn numeric_param<T>(value: Option<&str>, name: &str) -> std::result::Result<T, HttpResponse>
where
    T: std::str::FromStr + Default,
{
    match value {
        None => Ok(T::default()),
        Some(value) => value.trim().parse().map_err(|_| {
            client_error(400, "bad-request", format!("{name} must be a non-negative integer, got {value}"))
        }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
