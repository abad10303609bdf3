// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use renderwerk_core::types::DeclaredType;

#[derive(Parser)]
#[command(name = "renderwerk")]
#[command(about = "Preview thumbnails and OCR text extraction for images, video, and PDF")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON). Missing files fall back to defaults.
    #[arg(long, global = true, env = "RENDERWERK_CONFIG", default_value = "renderwerk.json")]
    pub config: PathBuf,

    /// Parent directory for per-request working areas
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Deadline for each operation in seconds (0 waits indefinitely)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP render server until interrupted
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (0 picks a free port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate a preview thumbnail for a file
    Preview {
        file: PathBuf,

        /// Declared content type (inferred from the extension when omitted)
        #[arg(short = 't', long = "type", value_enum)]
        kind: Option<ContentKind>,

        /// Maximum preview width (0 = unconstrained)
        #[arg(long, default_value_t = 0)]
        max_width: u32,

        /// Maximum preview height (0 = unconstrained)
        #[arg(long, default_value_t = 0)]
        max_height: u32,

        /// Output path (defaults to `<stem>.preview.<ext>` beside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract text from a PDF, running OCR when it has none
    Ocr {
        file: PathBuf,

        /// Strip ruling lines and collapse whitespace
        #[arg(long)]
        clean_up: bool,

        /// Write the text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also save the processed PDF
        #[arg(long)]
        document_out: Option<PathBuf>,
    },

    /// Run preview and OCR concurrently on one PDF and print a JSON summary
    Render {
        file: PathBuf,

        #[arg(long, default_value_t = 0)]
        max_width: u32,

        #[arg(long, default_value_t = 0)]
        max_height: u32,

        #[arg(long)]
        clean_up: bool,

        /// Where to write the preview (defaults beside the input)
        #[arg(long)]
        preview_out: Option<PathBuf>,
    },

    /// Report which external programs are available on PATH
    Doctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentKind {
    Image,
    Video,
    Pdf,
}

impl From<ContentKind> for DeclaredType {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Image => DeclaredType::Image,
            ContentKind::Video => DeclaredType::Video,
            ContentKind::Pdf => DeclaredType::Pdf,
        }
    }
}
