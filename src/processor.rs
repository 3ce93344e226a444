//! Upload processor
//!
//! `UploadProcessor` runs one upload through the pipeline:
//!
//! ```text
//! Start -> Validated -> OriginalPersisted -> RemovalRequested
//!       -> RemovalCompleted -> ResultPersisted -> Done
//! ```
//!
//! Any stage can fail. Every run, including one whose backend panics, ends
//! in exactly one [`PipelineOutcome`]. A failure after the original was
//! stored keeps the original in the outcome.

use crate::{
    backends::{GenerativeModelBackend, RemoteServiceBackend, RemovalBackend},
    config::{EraserConfig, RemovalConfig, RemovalStrategy},
    error::{BgEraserError, Result},
    services::{
        ArtifactStore, MediaCodec, MediaFormatHandler, NoOpProgressReporter, ProgressReporter,
        ProgressTracker,
    },
    tracing_config::{events, spans},
    types::{ArtifactRecord, Bucket, PipelineOutcome, PipelineStage, PipelineTimings, UploadRequest},
    utils::UploadValidator,
};
use futures::FutureExt;
use instant::Instant;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Factory trait for creating removal backends
pub trait BackendFactory: Send + Sync {
    /// Create the backend selected by `config.strategy`
    ///
    /// # Errors
    ///
    /// Returns `BgEraserError` for:
    /// - Strategies this factory cannot build
    /// - Missing credentials or invalid endpoints
    fn create_backend(&self, config: &RemovalConfig) -> Result<Box<dyn RemovalBackend>>;

    /// List strategies this factory can build
    fn available_backends(&self) -> Vec<RemovalStrategy>;
}

/// Default backend factory implementation
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self, config: &RemovalConfig) -> Result<Box<dyn RemovalBackend>> {
        match config.strategy {
            RemovalStrategy::RemoteService => Ok(Box::new(RemoteServiceBackend::new(config)?)),
            RemovalStrategy::GenerativeModel => Ok(Box::new(GenerativeModelBackend::new(config)?)),
        }
    }

    fn available_backends(&self) -> Vec<RemovalStrategy> {
        vec![
            RemovalStrategy::RemoteService,
            RemovalStrategy::GenerativeModel,
        ]
    }
}

/// Mutable bookkeeping of one run, kept outside the run future so it
/// survives a panic inside it
struct RunState {
    stage: PipelineStage,
    original: Option<ArtifactRecord>,
    timings: PipelineTimings,
    tracker: ProgressTracker,
}

impl RunState {
    fn advance(&mut self, stage: PipelineStage) {
        self.stage = stage;
        self.tracker.report_stage(stage);
    }
}

/// Pipeline orchestrator shared by the CLI and the HTTP server
pub struct UploadProcessor {
    config: EraserConfig,
    validator: UploadValidator,
    store: ArtifactStore,
    backend: Box<dyn RemovalBackend>,
    reporter: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for UploadProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadProcessor")
            .field("backend", &self.backend.name())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl UploadProcessor {
    /// Create a processor with the default backend factory
    ///
    /// # Errors
    ///
    /// Returns `BgEraserError` for:
    /// - Invalid configuration
    /// - Backend construction failures
    pub fn new(config: EraserConfig) -> Result<Self> {
        Self::with_factory(config, &DefaultBackendFactory)
    }

    /// Create a processor with a custom backend factory
    ///
    /// # Errors
    ///
    /// Returns `BgEraserError` for:
    /// - Invalid configuration
    /// - Backend construction failures
    pub fn with_factory(config: EraserConfig, factory: &dyn BackendFactory) -> Result<Self> {
        config.validate()?;
        let backend = factory.create_backend(&config.removal)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Create a processor around an already built backend
    #[must_use]
    pub fn with_backend(config: EraserConfig, backend: Box<dyn RemovalBackend>) -> Self {
        info!(
            backend = backend.name(),
            storage_root = %config.storage.root.display(),
            "Upload processor ready"
        );
        Self {
            validator: UploadValidator::new(config.validation.clone()),
            store: ArtifactStore::new(config.storage.root.clone()),
            backend,
            reporter: Arc::new(NoOpProgressReporter),
            config,
        }
    }

    /// Replace the progress reporter used for every run
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EraserConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run one upload through the pipeline
    ///
    /// Never fails: every error, including a panic inside the backend, is
    /// folded into the returned outcome.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use bg_eraser::{EraserConfig, UploadProcessor, UploadRequest};
    ///
    /// # async fn example(bytes: Vec<u8>) -> anyhow::Result<()> {
    /// let processor = UploadProcessor::new(EraserConfig::default())?;
    /// let upload = UploadRequest::new(bytes, "image/png", "photo.png");
    /// let outcome = processor.process_upload(Some(upload)).await;
    ///
    /// if let Some(result) = outcome.processed_artifact() {
    ///     println!("Result available at {}", result.locator);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn process_upload(&self, upload: Option<UploadRequest>) -> PipelineOutcome {
        let file_name = upload
            .as_ref()
            .map_or("<none>", |u| u.original_file_name.as_str())
            .to_string();
        let span = spans::upload(&file_name, upload.as_ref().map_or(0, UploadRequest::size_bytes));

        let mut state = RunState {
            stage: PipelineStage::Start,
            original: None,
            timings: PipelineTimings::new(),
            tracker: ProgressTracker::new(Arc::clone(&self.reporter)),
        };

        let run = AssertUnwindSafe(self.run(upload.as_ref(), &mut state).instrument(span.clone()))
            .catch_unwind()
            .await;

        let result = match run {
            Ok(result) => result,
            Err(panic) => Err(BgEraserError::unexpected(format!(
                "Removal aborted: {}",
                panic_message(panic.as_ref())
            ))),
        };

        state.timings.total_ms = state.tracker.elapsed_ms();
        let _entered = span.enter();

        match result {
            Ok(processed) => {
                let Some(original) = state.original.take() else {
                    // run() only returns Ok after storing the original
                    let err = BgEraserError::unexpected("Original artifact missing after success");
                    return Self::fail(state, &err);
                };
                state.advance(PipelineStage::Done);
                state.tracker.report_completion(state.timings.clone());
                events::upload_completed(&original.locator, &processed.locator, state.timings.total_ms);
                PipelineOutcome::succeeded(original, processed, state.timings)
            },
            Err(err) => Self::fail(state, &err),
        }
    }

    fn fail(state: RunState, err: &BgEraserError) -> PipelineOutcome {
        state.tracker.report_error(&err.detail());
        events::upload_failed(state.stage, err);
        if state.original.is_some() {
            warn!(stage = %state.stage, "Keeping original after failure");
        }
        PipelineOutcome::failed(state.stage, state.original, err, state.timings)
    }

    /// Stages up to `ResultPersisted`; returns the processed artifact
    async fn run(
        &self,
        upload: Option<&UploadRequest>,
        state: &mut RunState,
    ) -> Result<ArtifactRecord> {
        state.advance(PipelineStage::Start);

        let started = Instant::now();
        let upload = self.validator.validate(upload)?;
        state.timings.validation_ms = elapsed_ms(started);
        state.advance(PipelineStage::Validated);

        let started = Instant::now();
        self.store.ensure_buckets().await?;
        let extension = MediaFormatHandler::upload_extension(
            &upload.original_file_name,
            &upload.declared_mime_type,
        );
        let original = self
            .store
            .save(&upload.file_bytes, &extension, Bucket::Input)
            .instrument(spans::storage_write(Bucket::Input))
            .await?;
        state.timings.persist_original_ms = elapsed_ms(started);
        debug!(locator = %original.locator, "Original stored");
        state.original = Some(original);
        state.advance(PipelineStage::OriginalPersisted);

        let declared = MediaFormatHandler::normalize_mime(&upload.declared_mime_type);
        let encoded = MediaCodec::encode(&upload.file_bytes, &declared);
        state.advance(PipelineStage::RemovalRequested);

        let started = Instant::now();
        let removal = self
            .backend
            .remove_background(&encoded)
            .instrument(spans::removal(self.backend.name()))
            .await;
        state.timings.removal_ms = elapsed_ms(started);
        let result = removal?;
        state.advance(PipelineStage::RemovalCompleted);

        let started = Instant::now();
        let decoded = MediaCodec::decode(&result)?;
        let extension = MediaFormatHandler::result_extension(&decoded.mime_type);
        let processed = self
            .store
            .save(&decoded.bytes, &extension, Bucket::Output)
            .instrument(spans::storage_write(Bucket::Output))
            .await?;
        state.timings.persist_result_ms = elapsed_ms(started);
        state.advance(PipelineStage::ResultPersisted);

        Ok(processed)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
