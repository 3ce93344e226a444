//! Progress reporting service
//!
//! Two separate concerns live here. Stage reporting lets the pipeline tell
//! pluggable reporters which state a run has reached. Simulated upload
//! progress is a purely cosmetic counter a frontend can animate while it
//! waits for the pipeline's single response; it carries no information
//! about the backend.

use crate::types::{PipelineStage, PipelineTimings};
use instant::Instant;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Progress update containing stage and timing information
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since the run started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    /// Create a new progress update
    #[must_use]
    pub fn new(stage: PipelineStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Trait for reporting progress of pipeline runs
pub trait ProgressReporter: Send + Sync {
    /// Report that a run reached a new stage
    fn report_progress(&self, update: ProgressUpdate);

    /// Report run completion with final timings
    fn report_completion(&self, timings: PipelineTimings);

    /// Report a failed run
    ///
    /// # Arguments
    /// * `stage` - Last stage reached before the failure
    /// * `error` - Error description
    fn report_error(&self, stage: PipelineStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: PipelineTimings) {}

    fn report_error(&self, _stage: PipelineStage, _error: &str) {}
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to show elapsed time and stage timings
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: PipelineTimings) {
        log::info!("✅ Upload processed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Validation: {}ms", timings.validation_ms);
            log::info!("    • Save original: {}ms", timings.persist_original_ms);
            log::info!("    • Background removal: {}ms", timings.removal_ms);
            log::info!("    • Save result: {}ms", timings.persist_result_ms);
        }
    }

    fn report_error(&self, stage: PipelineStage, error: &str) {
        log::error!("❌ Failed after '{}': {}", stage.description(), error);
    }
}

/// Per-run tracker that stamps updates with elapsed time
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<PipelineStage>,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified reporter
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Create a progress tracker with no-op reporter
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Arc::new(NoOpProgressReporter))
    }

    /// Create a progress tracker with console reporter
    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Arc::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Report progress for a specific stage
    pub fn report_stage(&mut self, stage: PipelineStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    /// Report completion with final timings
    pub fn report_completion(&self, timings: PipelineTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error at the last reached stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(PipelineStage::Start);
        self.reporter.report_error(stage, error);
    }

    /// Get the elapsed time since tracking started
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Get the last reported stage
    #[must_use]
    pub fn current_stage(&self) -> Option<PipelineStage> {
        self.current_stage
    }
}

/// Ceiling the simulated counter never passes while a request is in flight
pub const SIMULATED_PROGRESS_CEILING: u8 = 90;

/// Increment applied on every tick
pub const SIMULATED_PROGRESS_STEP: u8 = 10;

/// Default tick period of the simulated counter
pub const SIMULATED_PROGRESS_PERIOD: Duration = Duration::from_millis(200);

/// Optimistic upload progress shown while waiting for a response
///
/// `None` means idle. The counter climbs from 0 in fixed steps, freezes at
/// [`SIMULATED_PROGRESS_CEILING`], jumps to 100 on success and returns to
/// idle on failure.
///
/// # Examples
/// ```rust
/// use bg_eraser::services::SimulatedUploadProgress;
///
/// let mut progress = SimulatedUploadProgress::new();
/// progress.start();
/// progress.tick();
/// assert_eq!(progress.value(), Some(10));
/// progress.complete();
/// assert_eq!(progress.value(), Some(100));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedUploadProgress {
    value: Option<u8>,
}

impl SimulatedUploadProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn value(&self) -> Option<u8> {
        self.value
    }

    /// Begin a new request at 0
    pub fn start(&mut self) {
        self.value = Some(0);
    }

    /// Advance one step; no effect when idle or at the ceiling
    pub fn tick(&mut self) -> Option<u8> {
        if let Some(current) = self.value {
            if current < SIMULATED_PROGRESS_CEILING {
                self.value = Some(
                    current
                        .saturating_add(SIMULATED_PROGRESS_STEP)
                        .min(SIMULATED_PROGRESS_CEILING),
                );
            }
        }
        self.value
    }

    /// The request succeeded
    pub fn complete(&mut self) {
        self.value = Some(100);
    }

    /// The request failed
    pub fn fail(&mut self) {
        self.value = None;
    }

    /// Return to idle
    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Shortest period accepted by [`drive_simulated_progress`]
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Run `future` while ticking `progress` every `period`
///
/// `on_tick` receives every value the counter takes, starting with 0. The
/// counter is left at its last in-flight value; the caller decides between
/// [`SimulatedUploadProgress::complete`] and [`SimulatedUploadProgress::fail`]
/// from the returned output. A zero `period` is raised to one millisecond.
pub async fn drive_simulated_progress<F, C>(
    progress: &mut SimulatedUploadProgress,
    period: Duration,
    future: F,
    mut on_tick: C,
) -> F::Output
where
    F: Future,
    C: FnMut(u8),
{
    progress.start();
    on_tick(0);

    tokio::pin!(future);
    let mut ticker = tokio::time::interval(period.max(MIN_TICK_PERIOD));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            output = &mut future => return output,
            _ = ticker.tick() => {
                let before = progress.value();
                if let Some(value) = progress.tick() {
                    if before != Some(value) {
                        on_tick(value);
                    }
                }
            }
        }
    }
}
