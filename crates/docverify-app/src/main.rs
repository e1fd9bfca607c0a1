// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocVerify: identity-document verification from the command line.
//
// Entry point. Initialises logging, resolves configuration, wires the OCR
// engines into a pipeline, and prints one JSON report per image on stdout.
// Logs go to stderr so the output stays machine-readable.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use docverify_core::error::{DocVerifyError, Result};
use docverify_core::human_errors::humanize_error;
use docverify_core::types::ProcessingStatus;
use docverify_imaging::ImageSource;
use docverify_pipeline::DocumentPipeline;
use serde_json::json;

#[derive(Parser)]
#[command(name = "docverify")]
#[command(about = "Classify, extract, and validate Indian identity documents from images")]
#[command(version)]
struct Args {
    /// Pipeline configuration file (JSON). Defaults to config.json in the
    /// data directory when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only run preprocessing and OCR; print the recognised text.
    #[arg(long)]
    ocr_only: bool,

    /// Document images to process.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(images = args.images.len(), "DocVerify starting");

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::error!(error = %err, "DocVerify could not start");
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

/// Process every image; `Ok(false)` when any of them failed.
async fn run(args: Args) -> Result<bool> {
    let config = services::settings::load(args.config.as_deref())?;
    let ensemble = services::engines::build_ensemble(&config.recognition)?;
    let pipeline = DocumentPipeline::new(config, ensemble)?;

    // Requests are independent; run them concurrently, print in input order.
    let tasks: Vec<_> = args
        .images
        .into_iter()
        .map(|path| {
            let pipeline = pipeline.clone();
            let ocr_only = args.ocr_only;
            tokio::spawn(async move {
                if ocr_only {
                    recognize_only(&pipeline, path).await
                } else {
                    process_one(&pipeline, path).await
                }
            })
        })
        .collect();

    let mut all_ok = true;
    for task in tasks {
        let (output, ok) = task
            .await
            .map_err(|err| DocVerifyError::Recognition(format!("worker task failed: {}", err)))??;
        println!("{}", serde_json::to_string_pretty(&output)?);
        all_ok &= ok;
    }
    Ok(all_ok)
}

async fn process_one(pipeline: &DocumentPipeline, path: PathBuf) -> Result<(serde_json::Value, bool)> {
    let report = pipeline.process_path(&path).await;
    let ok = report.status == ProcessingStatus::Success;
    Ok((serde_json::to_value(&report)?, ok))
}

async fn recognize_only(pipeline: &DocumentPipeline, path: PathBuf) -> Result<(serde_json::Value, bool)> {
    let shown_path = path.display().to_string();
    let decoded = tokio::task::spawn_blocking(move || ImageSource::open(&path))
        .await
        .map_err(|err| DocVerifyError::Decode(format!("decoder task failed: {}", err)))?;

    let source = match decoded {
        Ok(source) => source,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::warn!(path = %shown_path, error = %err, "skipping unreadable image");
            return Ok((
                json!({ "path": shown_path, "error": err.to_string(), "hint": human.suggestion }),
                false,
            ));
        }
    };

    let prepared = pipeline.preprocess(source.into_dynamic()).await;
    let recognition = pipeline.recognize(prepared).await;
    Ok((json!({ "path": shown_path, "recognition": recognition }), true))
}
