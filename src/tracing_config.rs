//! Tracing configuration module for structured logging and observability
//!
//! Applications (the CLI and the HTTP server) configure subscribers here;
//! the library itself only emits spans and events through the helpers in
//! [`spans`] and [`events`]. Console output goes to stderr so stdout stays
//! free for results.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output for CI environments
    Compact,
    /// JSON structured logging for production environments
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Configuration for tracing output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    /// Output to stderr (default)
    Console,
    /// Output to a file
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
    /// Output to both console and file
    #[cfg(feature = "tracing-files")]
    Both(std::path::PathBuf),
}

/// Keeps background log writers alive; drop it only at shutdown
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Output format
    pub format: TracingFormat,
    /// Output destination
    pub output: TracingOutput,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-3+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set output format
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for request correlation
    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // Default: uploads, outcomes, server lifecycle
            1 => "debug", // -v: stage transitions, locators, backend calls
            _ => "trace", // -vv+: HTTP client internals
        }
    }

    /// Initialize tracing subscriber based on configuration
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        use tracing_subscriber::fmt;
        #[cfg(feature = "tracing-files")]
        use tracing_subscriber::Layer as _;

        let filter = if let Some(env_filter) = &self.env_filter {
            EnvFilter::try_new(env_filter)?
        } else {
            EnvFilter::try_new(self.verbosity_to_filter())?
        };

        let registry = Registry::default().with(filter);
        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        match (&self.format, &self.output) {
            (TracingFormat::Console, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },

            (TracingFormat::Compact, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(false)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-json")]
            (TracingFormat::Json, TracingOutput::Console) => {
                let fmt_layer = fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-files")]
            (format, TracingOutput::File(path)) => {
                let (file_writer, file_guard) = file_writer(path);
                guard._file_guard = Some(file_guard);

                let fmt_layer = match format {
                    TracingFormat::Console | TracingFormat::Compact => fmt::layer()
                        .with_ansi(false)
                        .with_writer(file_writer)
                        .compact()
                        .boxed(),
                    #[cfg(feature = "tracing-json")]
                    TracingFormat::Json => fmt::layer()
                        .json()
                        .with_writer(file_writer)
                        .with_current_span(true)
                        .with_span_list(true)
                        .boxed(),
                };
                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-files")]
            (format, TracingOutput::Both(path)) => {
                let console_layer = match format {
                    TracingFormat::Console => fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(true)
                        .with_target(false)
                        .compact()
                        .boxed(),
                    TracingFormat::Compact => fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(false)
                        .with_target(false)
                        .compact()
                        .boxed(),
                    #[cfg(feature = "tracing-json")]
                    TracingFormat::Json => fmt::layer()
                        .with_writer(std::io::stderr)
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .boxed(),
                };

                let (file_writer, file_guard) = file_writer(path);
                guard._file_guard = Some(file_guard);
                let file_layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_writer)
                    .compact();

                registry.with(console_layer).with(file_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "🚀 bg-eraser session started");
        }

        Ok(guard)
    }
}

#[cfg(feature = "tracing-files")]
fn file_writer(
    path: &std::path::Path,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    let appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| std::path::Path::new(".")),
        path.file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("bg-eraser.log")),
    );
    tracing_appender::non_blocking(appender)
}

/// Convenience function to initialize tracing with CLI-friendly defaults
///
/// # Errors
/// - Subscriber initialization failures
#[cfg(feature = "cli")]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<TracingGuard> {
    let session_id = uuid::Uuid::new_v4().to_string();

    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(TracingFormat::Console)
        .with_session_id(session_id)
        .init()
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering one pipeline run
    pub fn upload(file_name: &str, size_bytes: u64) -> Span {
        tracing::span!(
            Level::INFO,
            "upload",
            file_name = %file_name,
            size_bytes = size_bytes
        )
    }

    /// Span covering the call to a removal backend
    pub fn removal(backend: &str) -> Span {
        tracing::span!(Level::INFO, "removal", backend = %backend)
    }

    /// Span covering one artifact write
    pub fn storage_write(bucket: crate::types::Bucket) -> Span {
        tracing::span!(Level::DEBUG, "storage_write", bucket = %bucket)
    }

    /// Span covering a batch of CLI inputs
    pub fn batch_processing(file_count: usize) -> Span {
        tracing::span!(Level::INFO, "batch_processing", file_count = file_count)
    }

    /// Span covering one HTTP upload request
    pub fn http_upload(request_id: &str) -> Span {
        tracing::span!(Level::INFO, "http_upload", request_id = %request_id)
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use crate::{error::BgEraserError, types::PipelineStage};
    use tracing::{info, warn};

    /// A run finished with both artifacts stored
    pub fn upload_completed(original: &str, processed: &str, total_ms: u64) {
        info!(
            original = %original,
            processed = %processed,
            total_ms = total_ms,
            "✅ Upload processed"
        );
    }

    /// A run ended in an error
    pub fn upload_failed(stage: PipelineStage, error: &BgEraserError) {
        let kind = error.kind();
        if kind.is_rejection() {
            info!(stage = %stage, kind = %kind, error = %error, "Upload rejected");
        } else {
            warn!(stage = %stage, kind = %kind, error = %error, "❌ Upload failed");
        }
    }

    /// Log a user-facing progress update
    pub fn progress(message: &str, emoji: &str) {
        info!("{} {}", emoji, message);
    }
}
