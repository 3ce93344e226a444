//! HTTP upload server
//!
//! Endpoints:
//! - POST /api/upload - multipart upload, field `image`
//! - GET /health - health check
//! - GET /images-input/* and /images-output/* - stored artifacts
//!
//! Every upload answers with the serialized [`PipelineOutcome`]; the status
//! code follows [`ErrorKind::http_status`](crate::error::ErrorKind::http_status).

use crate::{
    error::{BgEraserError, Result},
    processor::UploadProcessor,
    services::format::OCTET_STREAM,
    tracing_config::spans,
    types::{Bucket, PipelineOutcome, PipelineStage, PipelineTimings, UploadRequest},
    utils::NumericValidator,
};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, Instrument};

/// Room for multipart boundaries and headers on top of the upload ceiling
pub const MULTIPART_SLACK_BYTES: u64 = 64 * 1024;

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "image";

/// HTTP server state shared across handlers
#[derive(Clone)]
struct ServerState {
    processor: Arc<UploadProcessor>,
}

/// HTTP server exposing the upload pipeline
pub struct UploadServer {
    bind_address: String,
    processor: Arc<UploadProcessor>,
}

impl UploadServer {
    /// Create a server bound to the configured address
    #[must_use]
    pub fn new(processor: Arc<UploadProcessor>) -> Self {
        Self {
            bind_address: processor.config().server.bind_address.clone(),
            processor,
        }
    }

    /// Override the bind address
    #[must_use]
    pub fn with_bind_address<S: Into<String>>(mut self, bind_address: S) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    /// Build the router with all endpoints
    ///
    /// # Errors
    /// - The body limit does not fit in memory on this platform
    pub fn build_router(&self) -> Result<Router> {
        build_router(Arc::clone(&self.processor))
    }

    /// Start the HTTP server; returns after Ctrl-C
    ///
    /// # Errors
    /// - Invalid bind address
    /// - The address cannot be bound
    pub async fn serve(self) -> Result<()> {
        let addr: std::net::SocketAddr = self.bind_address.parse().map_err(|e| {
            BgEraserError::invalid_config(format!(
                "Invalid bind address '{}': {}",
                self.bind_address, e
            ))
        })?;

        self.processor.store().ensure_buckets().await?;
        let router = self.build_router()?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BgEraserError::unexpected(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(
            address = %addr,
            backend = self.processor.backend_name(),
            "Starting upload server"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| BgEraserError::unexpected(format!("Server error: {}", e)))?;

        tracing::info!("Upload server stopped");
        Ok(())
    }
}

/// Build the upload router around a shared processor
///
/// # Errors
/// - The body limit does not fit in memory on this platform
pub fn build_router(processor: Arc<UploadProcessor>) -> Result<Router> {
    let limit = NumericValidator::safe_add_u64(
        processor.config().validation.max_upload_bytes,
        MULTIPART_SLACK_BYTES,
    )?;
    let limit = NumericValidator::validate_u64_to_usize(limit)?;

    let input_dir = processor.store().bucket_dir(Bucket::Input);
    let output_dir = processor.store().bucket_dir(Bucket::Output);
    let state = ServerState { processor };

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route("/api/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(limit))
        .nest_service(
            &format!("/{}", Bucket::Input.dir_name()),
            ServeDir::new(input_dir),
        )
        .nest_service(
            &format!("/{}", Bucket::Output.dir_name()),
            ServeDir::new(output_dir),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

// Handler implementations

/// Health check endpoint
async fn health_handler(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.processor.backend_name(),
    }))
}

/// Upload endpoint
async fn upload_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<PipelineOutcome>) {
    let request_id = uuid::Uuid::new_v4().to_string();
    let max = state.processor.config().validation.max_upload_bytes;

    let outcome = async {
        let upload = match multipart {
            Ok(multipart) => read_upload(multipart).await,
            Err(rejection) => {
                debug!("Upload is not a multipart body: {}", rejection.body_text());
                Ok(None)
            },
        };

        match upload {
            Ok(upload) => state.processor.process_upload(upload).await,
            Err(e) => {
                let err = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    BgEraserError::TooLarge {
                        size: declared_length(&headers).unwrap_or_else(|| max.saturating_add(1)),
                        max,
                    }
                } else {
                    debug!("Unreadable multipart body: {}", e.body_text());
                    BgEraserError::MissingFile
                };
                crate::tracing_config::events::upload_failed(PipelineStage::Start, &err);
                PipelineOutcome::failed(PipelineStage::Start, None, &err, PipelineTimings::new())
            },
        }
    }
    .instrument(spans::http_upload(&request_id))
    .await;

    let status = outcome
        .error_kind()
        .map_or(StatusCode::OK, |kind| {
            StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        });

    (status, Json(outcome))
}

/// Pull the `image` field out of the multipart body, if present
async fn read_upload(
    mut multipart: Multipart,
) -> std::result::Result<Option<UploadRequest>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let mime_type = field.content_type().unwrap_or(OCTET_STREAM).to_string();
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;

        return Ok(Some(UploadRequest::new(bytes.to_vec(), mime_type, file_name)));
    }
    Ok(None)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}
