//! Mock backends for exercising the pipeline without a removal service

use crate::{
    backends::RemovalBackend,
    error::BgEraserError,
    services::MediaCodec,
    types::{EncodedImage, RemovalResult},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// What a [`MockRemovalBackend`] does when called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the given image
    Succeed(EncodedImage),
    /// Return the input unchanged
    Echo,
    /// Fail with a remote status error
    FailStatus(u16, String),
    /// Report success without an image
    Empty,
    /// Panic inside the call
    Panic(String),
}

/// Scriptable backend that records every image it receives
#[derive(Debug, Clone)]
pub struct MockRemovalBackend {
    behavior: MockBehavior,
    calls: Arc<Mutex<Vec<EncodedImage>>>,
}

impl MockRemovalBackend {
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Backend answering with `bytes` tagged as `mime_type`
    #[must_use]
    pub fn returning(bytes: &[u8], mime_type: &str) -> Self {
        Self::new(MockBehavior::Succeed(MediaCodec::encode(bytes, mime_type)))
    }

    /// Shared handle on the recorded calls
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<Vec<EncodedImage>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RemovalBackend for MockRemovalBackend {
    async fn remove_background(&self, image: &EncodedImage) -> RemovalResult {
        self.calls.lock().unwrap().push(image.clone());
        match &self.behavior {
            MockBehavior::Succeed(result) => Ok(result.clone()),
            MockBehavior::Echo => Ok(image.clone()),
            MockBehavior::FailStatus(status, body) => {
                Err(BgEraserError::remote_status(*status, body))
            },
            MockBehavior::Empty => Err(BgEraserError::empty_result(
                "No processed image URL was returned.",
            )),
            MockBehavior::Panic(message) => panic!("{}", message),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
