//! Core types for the upload pipeline

use crate::error::{BgEraserError, ErrorKind, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status message attached to a successful run
pub const SUCCESS_MESSAGE: &str = "Image processed successfully!";

/// Status message attached to a run that kept the original but failed later
pub const PARTIAL_SUCCESS_MESSAGE: &str =
    "Original image uploaded, but background removal did not complete.";

/// A single uploaded file, as received from the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Raw file content
    pub file_bytes: Vec<u8>,
    /// MIME type declared by the client (e.g. `image/png`)
    pub declared_mime_type: String,
    /// File name as sent by the client
    pub original_file_name: String,
}

impl UploadRequest {
    #[must_use]
    pub fn new<M: Into<String>, N: Into<String>>(
        file_bytes: Vec<u8>,
        declared_mime_type: M,
        original_file_name: N,
    ) -> Self {
        Self {
            file_bytes,
            declared_mime_type: declared_mime_type.into(),
            original_file_name: original_file_name.into(),
        }
    }

    /// Size of the uploaded content in bytes
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.file_bytes.len() as u64
    }
}

/// An image in its textual transport form: MIME type plus base64 payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64_payload: String,
}

impl EncodedImage {
    /// Render as a `data:` URI
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.base64_payload)
    }
}

/// Raw bytes recovered from an [`EncodedImage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Outcome of one background removal call
pub type RemovalResult = Result<EncodedImage>;

/// Logical storage area for artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Unprocessed uploads
    Input,
    /// Background removal results
    Output,
}

impl Bucket {
    /// Directory name under the storage root, also the public path prefix
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Input => "images-input",
            Self::Output => "images-output",
        }
    }

    /// Suffix appended to generated file names in this bucket
    #[must_use]
    pub fn name_suffix(self) -> &'static str {
        match self {
            Self::Input => "",
            Self::Output => "-processed",
        }
    }

    #[must_use]
    pub fn all() -> [Bucket; 2] {
        [Self::Input, Self::Output]
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// A persisted artifact with its public locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    /// Public path, e.g. `/images-input/<uuid>.png`
    pub locator: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bucket: Bucket,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// States of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Start,
    Validated,
    OriginalPersisted,
    RemovalRequested,
    RemovalCompleted,
    ResultPersisted,
    Done,
}

impl PipelineStage {
    /// Get a human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            PipelineStage::Start => "Receiving upload",
            PipelineStage::Validated => "Upload validated",
            PipelineStage::OriginalPersisted => "Original image saved",
            PipelineStage::RemovalRequested => "Removing background",
            PipelineStage::RemovalCompleted => "Background removed",
            PipelineStage::ResultPersisted => "Result image saved",
            PipelineStage::Done => "Processing completed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            PipelineStage::Start => 0,
            PipelineStage::Validated => 5,
            PipelineStage::OriginalPersisted => 15,
            PipelineStage::RemovalRequested => 20,
            PipelineStage::RemovalCompleted => 85,
            PipelineStage::ResultPersisted => 95,
            PipelineStage::Done => 100,
        }
    }

    /// Whether no further transitions can happen
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-stage timing breakdown of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTimings {
    pub validation_ms: u64,
    pub persist_original_ms: u64,
    pub removal_ms: u64,
    pub persist_result_ms: u64,
    pub total_ms: u64,
}

impl PipelineTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of the total spent waiting on the removal backend
    #[must_use]
    pub fn removal_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.removal_ms as f64 / self.total_ms as f64
        }
    }
}

/// Final, sole return value of one orchestration run
///
/// Constructed only through [`PipelineOutcome::succeeded`] and
/// [`PipelineOutcome::failed`], so a processed artifact and an error never
/// coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    original_artifact: Option<ArtifactRecord>,
    processed_artifact: Option<ArtifactRecord>,
    error_kind: Option<ErrorKind>,
    error_detail: Option<String>,
    status_message: Option<String>,
    failed_at: Option<PipelineStage>,
    timings: PipelineTimings,
}

impl PipelineOutcome {
    /// Outcome of a run that reached `Done`
    #[must_use]
    pub fn succeeded(
        original: ArtifactRecord,
        processed: ArtifactRecord,
        timings: PipelineTimings,
    ) -> Self {
        Self {
            original_artifact: Some(original),
            processed_artifact: Some(processed),
            error_kind: None,
            error_detail: None,
            status_message: Some(SUCCESS_MESSAGE.to_string()),
            failed_at: None,
            timings,
        }
    }

    /// Outcome of a run that failed after reaching `stage`
    #[must_use]
    pub fn failed(
        stage: PipelineStage,
        original: Option<ArtifactRecord>,
        error: &BgEraserError,
        timings: PipelineTimings,
    ) -> Self {
        let status_message = original
            .as_ref()
            .map(|_| PARTIAL_SUCCESS_MESSAGE.to_string());
        Self {
            original_artifact: original,
            processed_artifact: None,
            error_kind: Some(error.kind()),
            error_detail: Some(error.detail()),
            status_message,
            failed_at: Some(stage),
            timings,
        }
    }

    #[must_use]
    pub fn original_artifact(&self) -> Option<&ArtifactRecord> {
        self.original_artifact.as_ref()
    }

    #[must_use]
    pub fn processed_artifact(&self) -> Option<&ArtifactRecord> {
        self.processed_artifact.as_ref()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Last state reached before the failure, if the run failed
    #[must_use]
    pub fn failed_at(&self) -> Option<PipelineStage> {
        self.failed_at
    }

    #[must_use]
    pub fn timings(&self) -> &PipelineTimings {
        &self.timings
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }

    /// The original was saved even though a later stage failed
    #[must_use]
    pub fn is_partial_success(&self) -> bool {
        self.error_kind.is_some() && self.original_artifact.is_some()
    }
}
