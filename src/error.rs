//! Error types for the upload and background removal pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BgEraserError>;

/// Maximum number of characters of a remote response body kept in an error
pub const MAX_REMOTE_BODY_CHARS: usize = 300;

/// Maximum number of characters of any error detail surfaced to callers
pub const MAX_ERROR_DETAIL_CHARS: usize = 500;

/// Stable, serializable classification of every pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingFile,
    UnsupportedType,
    TooLarge,
    StorageWriteFailed,
    TransportError,
    RemoteStatusError,
    MalformedResponse,
    EmptyResult,
    MalformedEncoding,
    UnexpectedError,
}

impl ErrorKind {
    /// HTTP status code the upload endpoint answers with for this kind
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::MissingFile | Self::UnsupportedType => 400,
            Self::TooLarge => 413,
            Self::TransportError
            | Self::RemoteStatusError
            | Self::MalformedResponse
            | Self::EmptyResult
            | Self::MalformedEncoding => 502,
            Self::StorageWriteFailed | Self::UnexpectedError => 500,
        }
    }

    /// Whether the failure happened before any work was accepted
    #[must_use]
    pub fn is_rejection(self) -> bool {
        matches!(
            self,
            Self::MissingFile | Self::UnsupportedType | Self::TooLarge
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MissingFile => "missing_file",
            Self::UnsupportedType => "unsupported_type",
            Self::TooLarge => "too_large",
            Self::StorageWriteFailed => "storage_write_failed",
            Self::TransportError => "transport_error",
            Self::RemoteStatusError => "remote_status_error",
            Self::MalformedResponse => "malformed_response",
            Self::EmptyResult => "empty_result",
            Self::MalformedEncoding => "malformed_encoding",
            Self::UnexpectedError => "unexpected_error",
        };
        write!(f, "{}", name)
    }
}

/// Comprehensive error types for the pipeline
#[derive(Error, Debug)]
pub enum BgEraserError {
    /// No file was supplied with the upload
    #[error("No image file provided.")]
    MissingFile,

    /// Declared (or sniffed) content type is not accepted
    #[error("Invalid file type '{0}'. Only PNG, JPG, JPEG are allowed.")]
    UnsupportedType(String),

    /// Upload exceeds the configured ceiling
    #[error("File is too large ({size} bytes). Maximum size is {}.", format_limit(.max))]
    TooLarge { size: u64, max: u64 },

    /// Artifact could not be written to storage
    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    /// Request to the removal service could not be sent or read
    #[error("Transport error: {0}")]
    Transport(String),

    /// Removal service answered with a non-success status
    #[error("Remote service returned status {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    /// Removal service answered with an unexpected body
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Removal service reported success without an image
    #[error("Background removal failed. {0}")]
    EmptyResult(String),

    /// Data URI or base64 payload could not be decoded
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl BgEraserError {
    /// Classify this error into the pipeline taxonomy
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFile => ErrorKind::MissingFile,
            Self::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::StorageWriteFailed(_) => ErrorKind::StorageWriteFailed,
            Self::Transport(_) => ErrorKind::TransportError,
            Self::RemoteStatus { .. } => ErrorKind::RemoteStatusError,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::EmptyResult(_) => ErrorKind::EmptyResult,
            Self::MalformedEncoding(_) => ErrorKind::MalformedEncoding,
            Self::InvalidConfig(_) | Self::Unexpected(_) => ErrorKind::UnexpectedError,
        }
    }

    /// Error detail bounded to [`MAX_ERROR_DETAIL_CHARS`]
    #[must_use]
    pub fn detail(&self) -> String {
        truncate_chars(&self.to_string(), MAX_ERROR_DETAIL_CHARS)
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported type error
    pub fn unsupported_type<S: Into<String>>(mime_type: S) -> Self {
        Self::UnsupportedType(mime_type.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new malformed response error
    pub fn malformed_response<S: Into<String>>(msg: S) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a new empty result error
    pub fn empty_result<S: Into<String>>(msg: S) -> Self {
        Self::EmptyResult(msg.into())
    }

    /// Create a new malformed encoding error
    pub fn malformed_encoding<S: Into<String>>(msg: S) -> Self {
        Self::MalformedEncoding(msg.into())
    }

    /// Create a new unexpected error, truncating the message
    pub fn unexpected<S: Into<String>>(msg: S) -> Self {
        Self::Unexpected(truncate_chars(&msg.into(), MAX_ERROR_DETAIL_CHARS))
    }

    /// Create a remote status error, truncating the response body
    #[must_use]
    pub fn remote_status(status: u16, body: &str) -> Self {
        Self::RemoteStatus {
            status,
            body: truncate_chars(body.trim(), MAX_REMOTE_BODY_CHARS),
        }
    }

    /// Create a transport error with the request context
    pub fn network_error<E: std::fmt::Display>(operation: &str, url: &str, error: E) -> Self {
        Self::Transport(format!("Failed to {} '{}': {}", operation, url, error))
    }

    /// Create storage error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::StorageWriteFailed(format!(
            "Failed to {} '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }
}

/// Truncate a string to at most `max_chars` characters, marking the cut
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text.get(..cut).unwrap_or(text)),
        None => text.to_string(),
    }
}

fn format_limit(bytes: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    let bytes = *bytes;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
