//! Endpoint and MIME type validation utilities

use crate::{
    error::{BgEraserError, Result},
    services::MediaFormatHandler,
};
use reqwest::Url;

/// Validator for URLs and MIME strings found in configuration
pub struct EndpointValidator;

impl EndpointValidator {
    /// Validate that `value` parses as an absolute http(s) URL with a host
    pub fn validate_http_url(value: &str, name: &str) -> Result<Url> {
        let url = Url::parse(value.trim()).map_err(|e| {
            BgEraserError::invalid_config(format!("Invalid {} '{}': {}", name, value, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(BgEraserError::invalid_config(format!(
                "Invalid {} '{}': scheme must be http or https",
                name, value
            )));
        }
        if url.host_str().is_none() {
            return Err(BgEraserError::invalid_config(format!(
                "Invalid {} '{}': missing host",
                name, value
            )));
        }

        Ok(url)
    }

    /// Validate a `type/subtype` MIME string
    pub fn validate_mime_type(mime_type: &str) -> Result<()> {
        if !MediaFormatHandler::is_well_formed_mime(mime_type) {
            return Err(BgEraserError::invalid_config(format!(
                "Accepted MIME type '{}' must have the form type/subtype",
                mime_type
            )));
        }
        Ok(())
    }
}
