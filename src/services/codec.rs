//! Data URI codec
//!
//! Converts raw image bytes to and from the `data:<mime>;base64,<payload>`
//! form used on the wire between the pipeline and its removal backends.

use crate::{
    error::{BgEraserError, Result},
    services::format::{MediaFormatHandler, OCTET_STREAM},
    types::{DecodedImage, EncodedImage},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Stateless codec between raw bytes and [`EncodedImage`]
pub struct MediaCodec;

impl MediaCodec {
    /// Wrap raw bytes into an encoded image. Never fails.
    ///
    /// # Examples
    /// ```rust
    /// use bg_eraser::services::MediaCodec;
    ///
    /// let encoded = MediaCodec::encode(b"hi", "image/png");
    /// assert_eq!(encoded.to_data_uri(), "data:image/png;base64,aGk=");
    /// ```
    #[must_use]
    pub fn encode(bytes: &[u8], mime_type: &str) -> EncodedImage {
        EncodedImage {
            mime_type: mime_type.to_string(),
            base64_payload: STANDARD.encode(bytes),
        }
    }

    /// Parse a data URI into its MIME type and payload without decoding it
    ///
    /// # Errors
    /// - `MalformedEncoding` when the URI does not contain exactly one `,`
    /// - `MalformedEncoding` when the prefix lacks the `;base64` marker
    pub fn parse(data_uri: &str) -> Result<EncodedImage> {
        let mut parts = data_uri.split(',');
        let (Some(meta), Some(payload), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(BgEraserError::malformed_encoding(
                "Invalid Data URI format: expected exactly one ',' separator",
            ));
        };

        if !meta.contains(BASE64_MARKER) {
            return Err(BgEraserError::malformed_encoding(
                "Invalid Data URI format: missing ';base64' marker",
            ));
        }

        Ok(EncodedImage {
            mime_type: Self::extract_mime(meta),
            base64_payload: payload.to_string(),
        })
    }

    /// Decode the payload of an encoded image back to bytes
    ///
    /// # Errors
    /// - `MalformedEncoding` when the payload is not valid base64
    pub fn decode(encoded: &EncodedImage) -> Result<DecodedImage> {
        let bytes = STANDARD
            .decode(encoded.base64_payload.trim())
            .map_err(|e| BgEraserError::malformed_encoding(format!("Invalid base64 payload: {}", e)))?;

        let mime_type = if MediaFormatHandler::is_well_formed_mime(&encoded.mime_type) {
            encoded.mime_type.clone()
        } else {
            OCTET_STREAM.to_string()
        };

        Ok(DecodedImage { bytes, mime_type })
    }

    /// Parse and decode a data URI in one step
    ///
    /// # Errors
    /// - Any error from [`MediaCodec::parse`] or [`MediaCodec::decode`]
    pub fn decode_data_uri(data_uri: &str) -> Result<DecodedImage> {
        let encoded = Self::parse(data_uri)?;
        Self::decode(&encoded)
    }

    /// MIME type between `data:` and the first `;`, or octet-stream
    fn extract_mime(meta: &str) -> String {
        let candidate = meta
            .find(':')
            .and_then(|start| meta.get(start + 1..))
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime.trim());

        match candidate {
            Some(mime) if MediaFormatHandler::is_well_formed_mime(mime) => mime.to_string(),
            _ => {
                if !meta.starts_with(DATA_PREFIX) {
                    log::debug!("Data URI prefix without 'data:' scheme: {}", meta);
                }
                OCTET_STREAM.to_string()
            },
        }
    }
}
