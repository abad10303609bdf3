// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RenderwerkError, Result};

/// Persistent service settings, loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub tools: ToolConfig,
    pub preview: PreviewConfig,
    pub ocr: OcrConfig,
    /// Parent directory for per-request working areas. `None` uses the
    /// system temp directory.
    pub work_dir: Option<PathBuf>,
    /// Deadline applied to requests that do not bring their own.
    /// `None` waits indefinitely.
    pub default_timeout_secs: Option<u64>,
}

/// Listener settings for the render server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Requests with a larger body are rejected before processing.
    pub max_request_bytes: usize,
    /// Pipelines allowed to run at once; further requests wait.
    pub max_concurrent_requests: usize,
    /// Time a client gets to deliver its whole request.
    pub read_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 50051,
            max_request_bytes: 256 * 1024 * 1024,
            max_concurrent_requests: 8,
            read_timeout_ms: 30_000,
        }
    }
}

/// Program names (or absolute paths) of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub ffmpeg: String,
    pub pdftoppm: String,
    pub pdftotext: String,
    pub qpdf: String,
    pub ocrmypdf: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            pdftoppm: "pdftoppm".into(),
            pdftotext: "pdftotext".into(),
            qpdf: "qpdf".into(),
            ocrmypdf: "ocrmypdf".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// JPEG quality (1-100) for re-encoded previews.
    pub jpeg_quality: u8,
    /// Largest preview, in pixels, a request may ask for. 0 disables the check.
    pub max_output_pixels: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 75,
            max_output_pixels: 40_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code(s) passed to ocrmypdf, e.g. `eng+deu`.
    pub language: Option<String>,
    /// Leave pages that already carry text untouched.
    pub skip_text: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: None,
            skip_text: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config: Self = serde_json::from_str(&data).map_err(|err| {
            RenderwerkError::Config(format!("{}: {}", path.display(), err))
        })?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overlay `RENDERWERK_PORT`, `RENDERWERK_WORK_DIR` and
    /// `RENDERWERK_TIMEOUT_SECS` from the environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = var("RENDERWERK_PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                RenderwerkError::Config(format!("RENDERWERK_PORT is not a port: {port}"))
            })?;
        }
        if let Some(dir) = var("RENDERWERK_WORK_DIR") {
            self.work_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = var("RENDERWERK_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                RenderwerkError::Config(format!("RENDERWERK_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            self.default_timeout_secs = (secs > 0).then_some(secs);
        }
        Ok(self)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_service_ports() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 50051);
        assert_eq!(config.tools.qpdf, "qpdf");
        assert_eq!(config.preview.jpeg_quality, 75);
        assert_eq!(config.preview.max_output_pixels, 40_000_000);
        assert_eq!(config.server.read_timeout_ms, 30_000);
        assert!(config.ocr.skip_text);
        assert!(config.default_timeout().is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.server.port, 50051);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderwerk.json");
        std::fs::write(&path, r#"{"server": {"port": 9000}, "ocr": {"language": "deu"}}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_concurrent_requests, 8);
        assert_eq!(config.ocr.language.as_deref(), Some("deu"));
        assert!(config.ocr.skip_text);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderwerk.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(RenderwerkError::Config(_))));
    }

    #[test]
    fn env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("RENDERWERK_PORT", "6000"),
            ("RENDERWERK_WORK_DIR", "/var/tmp/rw"),
            ("RENDERWERK_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::default()
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.work_dir, Some(PathBuf::from("/var/tmp/rw")));
        assert_eq!(config.default_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config = AppConfig {
            default_timeout_secs: Some(10),
            ..Default::default()
        }
        .apply_vars(|name| (name == "RENDERWERK_TIMEOUT_SECS").then(|| "0".to_string()))
        .unwrap();
        assert!(config.default_timeout().is_none());
    }

    #[test]
    fn bad_port_is_rejected() {
        let result = AppConfig::default()
            .apply_vars(|name| (name == "RENDERWERK_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(RenderwerkError::Config(_))));
    }
}
