// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Renderwerk: preview thumbnails and OCR text extraction.
//
// Entry point. Initialises logging, loads configuration and dispatches to the
// requested subcommand.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use renderwerk_core::config::AppConfig;
use renderwerk_core::error::Result;

use cli::{Cli, Commands};
use commands::Session;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Renderwerk starting");

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "renderwerk failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load(&cli.config)?.apply_env()?;
    let mut config = commands::apply_overrides(config, cli.work_dir, cli.timeout_secs);

    match cli.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            commands::serve(Session::new(config)).await
        }
        Commands::Preview {
            file,
            kind,
            max_width,
            max_height,
            output,
        } => {
            commands::preview(
                Session::new(config),
                &file,
                kind.map(Into::into),
                max_width,
                max_height,
                output,
            )
            .await
        }
        Commands::Ocr {
            file,
            clean_up,
            output,
            document_out,
        } => commands::ocr(Session::new(config), &file, clean_up, output, document_out).await,
        Commands::Render {
            file,
            max_width,
            max_height,
            clean_up,
            preview_out,
        } => {
            commands::render(
                Session::new(config),
                &file,
                max_width,
                max_height,
                clean_up,
                preview_out,
            )
            .await
        }
        Commands::Doctor => Ok(commands::doctor(Session::new(config))),
    }
}
