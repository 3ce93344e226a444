//! Generative model backend
//!
//! Sends the image together with a natural-language instruction to a
//! Gemini-style `generateContent` endpoint and takes the first inline image
//! part of the answer as the result.

use crate::{
    backends::RemovalBackend,
    config::RemovalConfig,
    error::{BgEraserError, Result},
    services::format::DEFAULT_RESULT_MIME,
    types::{EncodedImage, RemovalResult},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Backend delegating to an image-capable generative model
#[derive(Clone)]
pub struct GenerativeModelBackend {
    client: Client,
    api_base: String,
    model: String,
    instruction: String,
    api_key: String,
}

impl std::fmt::Debug for GenerativeModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeModelBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GenerativeModelBackend {
    /// Create a backend from the removal configuration
    ///
    /// # Errors
    /// - `InvalidConfig` when no API key is configured or the client cannot be built
    pub fn new(config: &RemovalConfig) -> Result<Self> {
        let api_key = config
            .generative
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                BgEraserError::invalid_config(
                    "Generative strategy requires an API key (set GEMINI_API_KEY or GOOGLE_API_KEY)",
                )
            })?;

        Ok(Self {
            client: super::http_client(config.timeout())?,
            api_base: config.generative.api_base.trim_end_matches('/').to_string(),
            model: config.generative.model.trim().to_string(),
            instruction: config.generative.instruction.clone(),
            api_key,
        })
    }

    /// Full `generateContent` URL for the configured model
    #[must_use]
    pub fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn request_body(&self, image: &EncodedImage) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": image.base64_payload,
                        }
                    },
                    { "text": self.instruction },
                ]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
            }
        })
    }

    /// First inline image of the first candidate that carries one
    fn extract_image(body: &str) -> Result<EncodedImage> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            BgEraserError::malformed_response(format!("Response is not valid JSON: {}", e))
        })?;

        let candidates = value
            .get("candidates")
            .and_then(Value::as_array)
            .ok_or_else(|| BgEraserError::malformed_response("Response has no 'candidates' array"))?;

        let image = candidates
            .iter()
            .filter_map(|candidate| candidate.pointer("/content/parts").and_then(Value::as_array))
            .flatten()
            .filter_map(|part| {
                part.get("inlineData")
                    .or_else(|| part.get("inline_data"))
                    .and_then(Value::as_object)
            })
            .find_map(|inline| {
                let data = inline.get("data").and_then(Value::as_str)?.trim();
                if data.is_empty() {
                    return None;
                }
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .filter(|mime| !mime.trim().is_empty())
                    .unwrap_or(DEFAULT_RESULT_MIME);
                Some(EncodedImage {
                    mime_type: mime_type.trim().to_string(),
                    base64_payload: data.to_string(),
                })
            });

        image.ok_or_else(|| {
            BgEraserError::empty_result("The model did not return an image.")
        })
    }
}

#[async_trait]
impl RemovalBackend for GenerativeModelBackend {
    #[instrument(skip(self, image), fields(model = %self.model, mime = %image.mime_type))]
    async fn remove_background(&self, image: &EncodedImage) -> RemovalResult {
        let endpoint = self.endpoint();

        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| BgEraserError::network_error("send request to", &endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BgEraserError::network_error("read response from", &endpoint, e))?;

        if !status.is_success() {
            return Err(BgEraserError::remote_status(status.as_u16(), &body));
        }

        let result = Self::extract_image(&body)?;
        debug!(mime = %result.mime_type, "Model returned image");
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "generative-model"
    }
}
