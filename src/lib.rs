#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Eraser
//!
//! Upload-and-background-removal pipeline. One upload goes through
//! validation, persistence of the original, a call to a removal backend,
//! and persistence of the processed result. Every run ends in exactly one
//! [`PipelineOutcome`].
//!
//! ## Features
//!
//! - **Upload validation**: presence, declared type, size ceiling, optional content sniffing
//! - **Artifact storage**: `images-input/` and `images-output/` buckets with unique names
//! - **Two removal strategies**: a remote HTTP service or a generative image model
//! - **Partial success**: a failed removal still reports the stored original
//! - **CLI Integration**: batch uploads from the command line (enable with `cli` feature)
//! - **HTTP server**: multipart upload endpoint (enable with `server` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bg_eraser::{EraserConfig, RemovalStrategy, UploadProcessor, UploadRequest};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = EraserConfig::builder()
//!     .strategy(RemovalStrategy::RemoteService)
//!     .endpoint("http://127.0.0.1:8000/remove-background")
//!     .storage_root("./public")
//!     .build()?;
//!
//! let processor = UploadProcessor::new(config)?;
//! let bytes = tokio::fs::read("photo.png").await?;
//! let outcome = processor
//!     .process_upload(Some(UploadRequest::new(bytes, "image/png", "photo.png")))
//!     .await;
//!
//! match outcome.processed_artifact() {
//!     Some(result) => println!("Processed image at {}", result.locator),
//!     None => eprintln!("Failed: {:?}", outcome.error_detail()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `server` (default): axum upload server
//! - `tracing-json`: JSON log output
//! - `tracing-files`: log output to a file
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bg-eraser = { version = "0.1", default-features = false }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod processor;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::{GenerativeModelBackend, RemoteServiceBackend, RemovalBackend};
pub use config::{
    EraserConfig, EraserConfigBuilder, GenerativeConfig, RemovalConfig, RemovalStrategy,
    ServerConfig, StorageConfig, ValidationPolicy,
};
pub use error::{BgEraserError, ErrorKind, Result};
pub use processor::{BackendFactory, DefaultBackendFactory, UploadProcessor};
#[cfg(feature = "server")]
pub use server::{build_router, UploadServer};
pub use services::{
    ArtifactStore, ConsoleProgressReporter, MediaCodec, MediaFormatHandler, NoOpProgressReporter,
    ProgressReporter, ProgressTracker, ProgressUpdate, SimulatedUploadProgress,
};
pub use tracing_config::{events, spans, TracingConfig, TracingFormat, TracingOutput};
#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
pub use types::{
    ArtifactRecord, Bucket, DecodedImage, EncodedImage, PipelineOutcome, PipelineStage,
    PipelineTimings, UploadRequest,
};
pub use utils::{EndpointValidator, NumericValidator, UploadValidator};

/// Run a single upload with a freshly built processor
///
/// Convenient for one-off calls; long-running callers should build one
/// [`UploadProcessor`] and reuse it.
///
/// # Errors
///
/// Only configuration problems are errors. Pipeline failures are reported in
/// the returned [`PipelineOutcome`].
///
/// # Examples
///
/// ```rust,no_run
/// use bg_eraser::{process_upload, EraserConfig, UploadRequest};
///
/// # async fn example(bytes: Vec<u8>) -> anyhow::Result<()> {
/// let upload = UploadRequest::new(bytes, "image/jpeg", "portrait.jpg");
/// let outcome = process_upload(EraserConfig::default(), Some(upload)).await?;
/// println!("{}", serde_json::to_string_pretty(&outcome)?);
/// # Ok(())
/// # }
/// ```
pub async fn process_upload(
    config: EraserConfig,
    upload: Option<UploadRequest>,
) -> Result<PipelineOutcome> {
    let processor = UploadProcessor::new(config)?;
    Ok(processor.process_upload(upload).await)
}
