//! Upload validation
//!
//! Decides whether an upload may enter the pipeline. Checks run in a fixed
//! order and the first failure wins: presence, declared type, size, then
//! (optionally) the content's magic bytes.

use crate::{
    config::ValidationPolicy,
    error::{BgEraserError, Result},
    services::MediaFormatHandler,
    types::UploadRequest,
};

/// Validator applying a [`ValidationPolicy`] to uploads
#[derive(Debug, Clone)]
pub struct UploadValidator {
    policy: ValidationPolicy,
}

impl UploadValidator {
    #[must_use]
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate an upload, returning it unchanged when accepted
    ///
    /// An upload with no bytes counts as missing.
    ///
    /// # Errors
    /// - `MissingFile` when no upload (or an empty one) was supplied
    /// - `UnsupportedType` when the declared type is not accepted, or when
    ///   content verification is on and the bytes are not an accepted image
    /// - `TooLarge` when the size exceeds the ceiling
    pub fn validate<'a>(&self, upload: Option<&'a UploadRequest>) -> Result<&'a UploadRequest> {
        let upload = match upload {
            Some(upload) if !upload.file_bytes.is_empty() => upload,
            _ => return Err(BgEraserError::MissingFile),
        };

        Self::validate_declared_type(&self.policy, &upload.declared_mime_type)?;
        Self::validate_size(&self.policy, upload.size_bytes())?;

        if self.policy.verify_content {
            Self::validate_content(&self.policy, &upload.file_bytes)?;
        }

        Ok(upload)
    }

    fn validate_declared_type(policy: &ValidationPolicy, declared: &str) -> Result<()> {
        let normalized = MediaFormatHandler::normalize_mime(declared);
        if policy.accepted_mime_types.contains(&normalized) {
            Ok(())
        } else {
            Err(BgEraserError::unsupported_type(declared.trim()))
        }
    }

    fn validate_size(policy: &ValidationPolicy, size: u64) -> Result<()> {
        if size > policy.max_upload_bytes {
            return Err(BgEraserError::TooLarge {
                size,
                max: policy.max_upload_bytes,
            });
        }
        Ok(())
    }

    fn validate_content(policy: &ValidationPolicy, bytes: &[u8]) -> Result<()> {
        match MediaFormatHandler::sniff_mime(bytes) {
            Some(sniffed) if Self::sniffed_type_accepted(policy, sniffed) => Ok(()),
            Some(sniffed) => Err(BgEraserError::unsupported_type(sniffed)),
            None => Err(BgEraserError::unsupported_type("unrecognized content")),
        }
    }

    // image/jpg is a common alias the sniffer never reports
    fn sniffed_type_accepted(policy: &ValidationPolicy, sniffed: &str) -> bool {
        policy.accepted_mime_types.contains(sniffed)
            || (sniffed == "image/jpeg" && policy.accepted_mime_types.contains("image/jpg"))
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}
