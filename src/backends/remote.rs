//! Remote removal service backend
//!
//! Protocol: `POST <endpoint>` with a multipart field `image`, answered by
//! JSON `{ "data": { "url": "..." } }`, then `GET <url>` for the result.
//! The result is re-encoded with the fetch's `Content-Type`.

use crate::{
    backends::RemovalBackend,
    config::RemovalConfig,
    error::{BgEraserError, Result},
    services::{
        format::{MediaFormatHandler, DEFAULT_RESULT_MIME, OCTET_STREAM},
        MediaCodec,
    },
    types::{EncodedImage, RemovalResult},
};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{multipart, Client, Url};
use serde_json::Value;
use tracing::{debug, instrument};

/// Backend delegating to an HTTP removal service
#[derive(Debug, Clone)]
pub struct RemoteServiceBackend {
    client: Client,
    endpoint: Url,
    max_result_bytes: u64,
}

impl RemoteServiceBackend {
    /// Create a backend from the removal configuration
    ///
    /// # Errors
    /// - `InvalidConfig` when the endpoint is not a URL or the client cannot be built
    pub fn new(config: &RemovalConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            BgEraserError::invalid_config(format!(
                "Invalid removal endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        Ok(Self {
            client: super::http_client(config.timeout())?,
            endpoint,
            max_result_bytes: config.max_result_bytes,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit the image and return the result URL the service answers with
    async fn submit(&self, image: &EncodedImage) -> Result<Url> {
        let decoded = MediaCodec::decode(image)?;
        let extension = MediaFormatHandler::result_extension(&decoded.mime_type);
        let mime = if MediaFormatHandler::is_well_formed_mime(&decoded.mime_type) {
            decoded.mime_type.as_str()
        } else {
            OCTET_STREAM
        };

        let part = multipart::Part::bytes(decoded.bytes)
            .file_name(format!("upload.{}", extension))
            .mime_str(mime)
            .map_err(|e| BgEraserError::malformed_encoding(format!("Invalid MIME type: {}", e)))?;
        let form = multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| BgEraserError::network_error("submit image to", self.endpoint.as_str(), e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            BgEraserError::network_error("read response from", self.endpoint.as_str(), e)
        })?;

        if !status.is_success() {
            return Err(BgEraserError::remote_status(status.as_u16(), &body));
        }

        let url = Self::result_url(&body)?;
        // Relative URLs resolve against the endpoint
        self.endpoint.join(&url).map_err(|e| {
            BgEraserError::malformed_response(format!("Invalid result URL '{}': {}", url, e))
        })
    }

    /// Extract `data.url` from the service's JSON answer
    fn result_url(body: &str) -> Result<String> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            BgEraserError::malformed_response(format!("Response is not valid JSON: {}", e))
        })?;

        let data = value
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| BgEraserError::malformed_response("Response has no 'data' object"))?;

        match data.get("url") {
            None | Some(Value::Null) => Err(BgEraserError::empty_result(
                "No processed image URL was returned.",
            )),
            Some(Value::String(url)) if url.trim().is_empty() => Err(BgEraserError::empty_result(
                "No processed image URL was returned.",
            )),
            Some(Value::String(url)) => Ok(url.trim().to_string()),
            Some(other) => Err(BgEraserError::malformed_response(format!(
                "'data.url' must be a string, got {}",
                other
            ))),
        }
    }

    /// Download the processed image, bounded by `max_result_bytes`
    async fn fetch(&self, url: &Url) -> Result<EncodedImage> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BgEraserError::network_error("fetch processed image from", url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BgEraserError::remote_status(status.as_u16(), &body));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_result_bytes {
                return Err(self.result_too_large(length));
            }
        }

        let mime_type = Self::result_mime(response.headers().get(reqwest::header::CONTENT_TYPE));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                BgEraserError::network_error("read processed image from", url.as_str(), e)
            })?;
            let total = bytes.len() as u64 + chunk.len() as u64;
            if total > self.max_result_bytes {
                return Err(self.result_too_large(total));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(BgEraserError::empty_result(
                "The processed image was empty.",
            ));
        }

        debug!(size = bytes.len(), mime = %mime_type, "Fetched processed image");
        Ok(MediaCodec::encode(&bytes, &mime_type))
    }

    /// MIME type of a fetched result, `image/png` when absent or unusable
    fn result_mime(header: Option<&reqwest::header::HeaderValue>) -> String {
        let Some(raw) = header else {
            return DEFAULT_RESULT_MIME.to_string();
        };

        let mime = raw
            .to_str()
            .ok()
            .map(MediaFormatHandler::normalize_mime)
            .filter(|mime| MediaFormatHandler::is_well_formed_mime(mime));
        match mime {
            Some(mime) => mime,
            None => {
                debug!(
                    content_type = ?raw,
                    fallback = DEFAULT_RESULT_MIME,
                    "Ignoring unusable Content-Type on processed image"
                );
                DEFAULT_RESULT_MIME.to_string()
            },
        }
    }

    fn result_too_large(&self, size: u64) -> BgEraserError {
        BgEraserError::malformed_response(format!(
            "Processed image exceeds {} bytes (got at least {})",
            self.max_result_bytes, size
        ))
    }
}

#[async_trait]
impl RemovalBackend for RemoteServiceBackend {
    #[instrument(skip(self, image), fields(endpoint = %self.endpoint, mime = %image.mime_type))]
    async fn remove_background(&self, image: &EncodedImage) -> RemovalResult {
        let url = self.submit(image).await?;
        debug!(result_url = %url, "Removal service accepted image");
        self.fetch(&url).await
    }

    fn name(&self) -> &'static str {
        "remote-service"
    }
}
