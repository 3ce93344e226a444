//! Configuration types for the upload pipeline

use crate::error::{BgEraserError, Result};
use crate::utils::{EndpointValidator, NumericValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default upload ceiling (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Largest upload ceiling the configuration accepts (100 MiB)
pub const MAX_UPLOAD_BYTES_LIMIT: u64 = 100 * 1024 * 1024;

/// Default cap on a downloaded removal result (50 MiB)
pub const DEFAULT_MAX_RESULT_BYTES: u64 = 50 * 1024 * 1024;

/// Default generative model able to return images
pub const DEFAULT_GENERATIVE_MODEL: &str = "gemini-2.0-flash-exp";

/// Default generative API base URL
pub const DEFAULT_GENERATIVE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default instruction sent with the image to the generative model
pub const DEFAULT_REMOVAL_INSTRUCTION: &str = "A high-quality image of a subject (person, object, etc.) on a diverse or complex background. Remove the background completely and precisely, leaving only the subject with a transparent background. The subject should be clearly defined and all remnants of the original background should be eliminated. The output image must retain the exact dimensions (width and height) of the original input image.";

/// Which backend performs the background removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalStrategy {
    /// Multipart upload to an HTTP removal service, then fetch of the result URL
    RemoteService,
    /// Single multimodal request to an image-capable generative model
    GenerativeModel,
}

impl Default for RemovalStrategy {
    fn default() -> Self {
        Self::RemoteService
    }
}

impl std::fmt::Display for RemovalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteService => write!(f, "remote-service"),
            Self::GenerativeModel => write!(f, "generative-model"),
        }
    }
}

impl std::str::FromStr for RemovalStrategy {
    type Err = BgEraserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote-service" | "remote" => Ok(Self::RemoteService),
            "generative-model" | "generative" => Ok(Self::GenerativeModel),
            other => Err(BgEraserError::invalid_config(format!(
                "Unknown removal strategy '{}'. Expected 'remote-service' or 'generative-model'",
                other
            ))),
        }
    }
}

/// Upload acceptance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationPolicy {
    /// Upload ceiling in bytes
    pub max_upload_bytes: u64,
    /// Accepted declared MIME types (lowercase)
    pub accepted_mime_types: BTreeSet<String>,
    /// Also sniff the content's magic bytes
    pub verify_content: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: ["image/png", "image/jpeg", "image/jpg"]
                .into_iter()
                .map(String::from)
                .collect(),
            verify_content: false,
        }
    }
}

/// Artifact storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Root holding the `images-input/` and `images-output/` buckets
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
        }
    }
}

/// Generative model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerativeConfig {
    pub api_base: String,
    pub model: String,
    pub instruction: String,
    /// Never serialized; filled from `GEMINI_API_KEY` / `GOOGLE_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GENERATIVE_API_BASE.to_string(),
            model: DEFAULT_GENERATIVE_MODEL.to_string(),
            instruction: DEFAULT_REMOVAL_INSTRUCTION.to_string(),
            api_key: None,
        }
    }
}

impl GenerativeConfig {
    /// API key from the environment
    #[must_use]
    pub fn api_key_from_env() -> Option<String> {
        ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

/// Removal backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemovalConfig {
    pub strategy: RemovalStrategy,
    /// Remote removal service endpoint
    pub endpoint: String,
    /// Timeout applied to every HTTP call made by a backend
    pub timeout_secs: u64,
    /// Cap on the size of a downloaded result
    pub max_result_bytes: u64,
    pub generative: GenerativeConfig,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            strategy: RemovalStrategy::default(),
            endpoint: "http://127.0.0.1:8000/remove-background".to_string(),
            timeout_secs: 60,
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            generative: GenerativeConfig::default(),
        }
    }
}

impl RemovalConfig {
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EraserConfig {
    pub validation: ValidationPolicy,
    pub storage: StorageConfig,
    pub removal: RemovalConfig,
    pub server: ServerConfig,
}

impl EraserConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bg_eraser::{EraserConfig, RemovalStrategy};
    ///
    /// let config = EraserConfig::builder()
    ///     .strategy(RemovalStrategy::RemoteService)
    ///     .endpoint("http://localhost:9000/remove")
    ///     .max_upload_bytes(5 * 1024 * 1024)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.validation.max_upload_bytes, 5 * 1024 * 1024);
    /// ```
    #[must_use]
    pub fn builder() -> EraserConfigBuilder {
        EraserConfigBuilder::default()
    }

    /// Load configuration from a JSON file; missing fields take defaults
    ///
    /// The generative API key is always read from the environment.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid JSON for this schema
    /// - Loaded values fail [`EraserConfig::validate`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BgEraserError::invalid_config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            BgEraserError::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.removal.generative.api_key = GenerativeConfig::api_key_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Upload ceiling: 1 byte to 100 MiB
    /// - Accepted MIME types: non-empty, each `type/subtype`
    /// - Timeout: 1-600 seconds
    /// - Result cap: positive
    /// - Endpoint (remote strategy) and API base (generative strategy): http(s) URLs
    ///
    /// # Errors
    /// - `InvalidConfig` describing the first failing rule
    pub fn validate(&self) -> Result<()> {
        if self.validation.max_upload_bytes == 0
            || self.validation.max_upload_bytes > MAX_UPLOAD_BYTES_LIMIT
        {
            return Err(BgEraserError::config_value_error(
                "max upload bytes",
                self.validation.max_upload_bytes,
                "1-104857600",
                Some(DEFAULT_MAX_UPLOAD_BYTES),
            ));
        }

        if self.validation.accepted_mime_types.is_empty() {
            return Err(BgEraserError::invalid_config(
                "At least one accepted MIME type is required",
            ));
        }
        for mime in &self.validation.accepted_mime_types {
            EndpointValidator::validate_mime_type(mime)?;
        }

        NumericValidator::validate_range(self.removal.timeout_secs, 1, 600, "Timeout seconds")?;
        NumericValidator::validate_positive(self.removal.max_result_bytes, "Max result bytes")?;

        match self.removal.strategy {
            RemovalStrategy::RemoteService => {
                EndpointValidator::validate_http_url(&self.removal.endpoint, "removal endpoint")?;
            },
            RemovalStrategy::GenerativeModel => {
                EndpointValidator::validate_http_url(
                    &self.removal.generative.api_base,
                    "generative API base",
                )?;
                if self.removal.generative.model.trim().is_empty() {
                    return Err(BgEraserError::invalid_config(
                        "Generative model name cannot be empty",
                    ));
                }
            },
        }

        Ok(())
    }
}

/// Builder for `EraserConfig`
#[derive(Debug, Default)]
pub struct EraserConfigBuilder {
    config: EraserConfig,
}

impl EraserConfigBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: EraserConfig) -> Self {
        Self { config }
    }

    /// Set upload ceiling (clamped to 100 MiB)
    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.validation.max_upload_bytes = bytes.min(MAX_UPLOAD_BYTES_LIMIT);
        self
    }

    /// Replace the accepted MIME types
    #[must_use]
    pub fn accepted_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.validation.accepted_mime_types = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_ascii_lowercase())
            .collect();
        self
    }

    /// Enable content sniffing during validation
    #[must_use]
    pub fn verify_content(mut self, verify: bool) -> Self {
        self.config.validation.verify_content = verify;
        self
    }

    /// Set the storage root
    #[must_use]
    pub fn storage_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.storage.root = root.into();
        self
    }

    /// Set the removal strategy
    #[must_use]
    pub fn strategy(mut self, strategy: RemovalStrategy) -> Self {
        self.config.removal.strategy = strategy;
        self
    }

    /// Set the remote removal endpoint
    #[must_use]
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.removal.endpoint = endpoint.into();
        self
    }

    /// Set HTTP timeout in seconds (clamped to 1-600)
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.removal.timeout_secs = secs.clamp(1, 600);
        self
    }

    /// Set the cap on downloaded result size
    #[must_use]
    pub fn max_result_bytes(mut self, bytes: u64) -> Self {
        self.config.removal.max_result_bytes = bytes;
        self
    }

    /// Set generative API base URL
    #[must_use]
    pub fn generative_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.config.removal.generative.api_base = api_base.into();
        self
    }

    /// Set generative model name
    #[must_use]
    pub fn generative_model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.removal.generative.model = model.into();
        self
    }

    /// Set generative instruction text
    #[must_use]
    pub fn instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.config.removal.generative.instruction = instruction.into();
        self
    }

    /// Set generative API key
    #[must_use]
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.config.removal.generative.api_key = api_key;
        self
    }

    /// Set HTTP server bind address
    #[must_use]
    pub fn bind_address<S: Into<String>>(mut self, address: S) -> Self {
        self.config.server.bind_address = address.into();
        self
    }

    /// Build the configuration with validation
    ///
    /// # Errors
    /// - Any rule checked by [`EraserConfig::validate`]
    pub fn build(self) -> Result<EraserConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
