//! Background removal backends
//!
//! The pipeline never touches pixels itself. It hands the encoded upload to a
//! [`RemovalBackend`] and receives the encoded result:
//! - [`RemoteServiceBackend`]: multipart upload to an HTTP removal service,
//!   followed by a fetch of the result URL it answers with
//! - [`GenerativeModelBackend`]: one multimodal request to an image-capable
//!   generative model

pub mod generative;
pub mod remote;

// Mock backends for pipeline tests
#[cfg(test)]
pub mod test_utils;

pub use self::generative::GenerativeModelBackend;
pub use self::remote::RemoteServiceBackend;

use crate::types::{EncodedImage, RemovalResult};
use async_trait::async_trait;

/// Capability of turning an encoded image into its background-removed form
///
/// Implementations make a single attempt and never retry. Every failure is
/// returned as an error classified by [`crate::error::ErrorKind`].
#[async_trait]
pub trait RemovalBackend: Send + Sync {
    /// Remove the background of `image`
    async fn remove_background(&self, image: &EncodedImage) -> RemovalResult;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Build the HTTP client shared by the backends
pub(crate) fn http_client(timeout: std::time::Duration) -> crate::error::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bg-eraser/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            crate::error::BgEraserError::invalid_config(format!(
                "Failed to create HTTP client: {}",
                e
            ))
        })
}
