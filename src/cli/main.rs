//! Background eraser CLI
//!
//! Runs local image files through the upload pipeline, or starts the HTTP
//! upload server with `--serve`.

use super::config::CliConfigBuilder;
use crate::{
    processor::UploadProcessor,
    services::{
        drive_simulated_progress, progress::SIMULATED_PROGRESS_PERIOD, ConsoleProgressReporter,
        MediaFormatHandler, NoOpProgressReporter, ProgressReporter, SimulatedUploadProgress,
    },
    tracing_config::{init_cli_tracing, spans},
    types::{PipelineOutcome, UploadRequest},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Extensions picked up when scanning directories
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Upload images and remove their backgrounds
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bg-eraser")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required_unless_present_any = &["serve", "show_config"])]
    pub input: Vec<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "PATH", env = "BG_ERASER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Background removal strategy
    #[arg(long, value_enum, env = "BG_ERASER_STRATEGY")]
    pub strategy: Option<CliStrategy>,

    /// Remote removal service endpoint
    #[arg(long, value_name = "URL", env = "BG_ERASER_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Directory holding the images-input and images-output buckets
    #[arg(long, value_name = "PATH", env = "BG_ERASER_STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    /// Largest accepted upload in bytes
    #[arg(long, value_name = "BYTES", env = "BG_ERASER_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<u64>,

    /// Timeout for each call to the removal backend, in seconds
    #[arg(long, value_name = "SECS", env = "BG_ERASER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Generative model name
    #[arg(long, env = "BG_ERASER_MODEL")]
    pub model: Option<String>,

    /// Address for `--serve`, e.g. 0.0.0.0:3000
    #[arg(long, value_name = "ADDR", env = "BG_ERASER_BIND")]
    pub bind: Option<String>,

    /// Reject files whose content does not match their declared type
    #[arg(long)]
    pub verify_content: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Print one JSON outcome per input instead of a summary line
    #[arg(long)]
    pub json: bool,

    /// Show an upload progress bar per file
    #[arg(long)]
    pub progress: bool,

    /// Start the HTTP upload server
    #[arg(long)]
    pub serve: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliStrategy {
    /// Multipart upload to a background removal service
    RemoteService,
    /// Image editing through a generative model
    GenerativeModel,
}

/// Main CLI entry point
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    // The progress bar owns the terminal while it is shown
    let reporter: Arc<dyn ProgressReporter> = if cli.progress || cli.json {
        Arc::new(NoOpProgressReporter)
    } else {
        Arc::new(ConsoleProgressReporter::new(cli.verbose > 0))
    };

    let processor = UploadProcessor::new(config)
        .context("Failed to create upload processor")?
        .with_reporter(reporter);

    if cli.serve {
        return serve(processor).await;
    }

    let start_time = Instant::now();
    let (succeeded, failed) = process_inputs(&cli, &processor).await?;

    info!(
        "Processed {} image(s) in {:.2}s ({} failed)",
        succeeded + failed,
        start_time.elapsed().as_secs_f64(),
        failed
    );

    if failed > 0 {
        anyhow::bail!("{} of {} upload(s) failed", failed, succeeded + failed);
    }

    Ok(())
}

#[cfg(feature = "server")]
async fn serve(processor: UploadProcessor) -> Result<()> {
    crate::server::UploadServer::new(Arc::new(processor))
        .serve()
        .await
        .context("Upload server failed")
}

#[cfg(not(feature = "server"))]
async fn serve(_processor: UploadProcessor) -> Result<()> {
    anyhow::bail!("--serve requires the `server` feature")
}

/// Run every input through the pipeline; returns (succeeded, failed)
async fn process_inputs(cli: &Cli, processor: &UploadProcessor) -> Result<(usize, usize)> {
    let files = collect_inputs(&cli.input, cli.recursive, cli.pattern.as_deref())?;

    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok((0, 0));
    }

    info!("Found {} image file(s) to upload", files.len());

    let mut succeeded = 0;
    let mut failed = 0;

    let batch = async {
        for path in &files {
            let outcome = process_file(path, processor, cli.progress).await?;

            if cli.json {
                let line = serde_json::json!({
                    "input": path.display().to_string(),
                    "outcome": outcome,
                });
                println!("{}", line);
            } else {
                println!("{}", summary_line(path, &outcome));
            }

            if outcome.is_success() {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }
        Ok::<_, anyhow::Error>(())
    };
    batch.instrument(spans::batch_processing(files.len())).await?;

    Ok((succeeded, failed))
}

/// Read one file and run it through the pipeline
async fn process_file(
    path: &Path,
    processor: &UploadProcessor,
    show_progress: bool,
) -> Result<PipelineOutcome> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());
    let upload = UploadRequest::new(bytes, MediaFormatHandler::mime_for_path(path), file_name);

    if !show_progress {
        return Ok(processor.process_upload(Some(upload)).await);
    }

    let bar = upload_progress_bar(path);
    let mut progress = SimulatedUploadProgress::new();
    let outcome = drive_simulated_progress(
        &mut progress,
        SIMULATED_PROGRESS_PERIOD,
        processor.process_upload(Some(upload)),
        |value| bar.set_position(u64::from(value)),
    )
    .await;

    if outcome.is_success() {
        progress.complete();
        bar.set_position(u64::from(progress.value().unwrap_or(100)));
        bar.finish_with_message("done");
    } else {
        progress.fail();
        bar.abandon_with_message("failed");
    }

    Ok(outcome)
}

fn upload_progress_bar(path: &Path) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar.set_prefix(
        path.file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().to_string()),
    );
    bar
}

fn summary_line(path: &Path, outcome: &PipelineOutcome) -> String {
    if let Some(processed) = outcome.processed_artifact() {
        return format!("✅ {} -> {}", path.display(), processed.locator);
    }

    let detail = outcome.error_detail().unwrap_or("unknown error");
    match outcome.original_artifact() {
        Some(original) => format!(
            "❌ {}: {} (original kept at {})",
            path.display(),
            detail,
            original.locator
        ),
        None => format!("❌ {}: {}", path.display(), detail),
    }
}

/// Expand inputs into a sorted list of files
///
/// Explicit files are kept as given so the pipeline can reject them with a
/// proper outcome; directories are scanned for image extensions.
fn collect_inputs(inputs: &[String], recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);

        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            files.extend(find_image_files(&path, recursive, pattern)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    files.sort();
    Ok(files)
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if is_image_file(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if is_image_file(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}
