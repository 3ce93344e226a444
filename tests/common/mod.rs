//! Shared fixtures for integration tests
//!
//! Provides a small PNG fixture, scriptable in-process backends and local
//! HTTP stand-ins for the remote removal service and the generative model.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use bg_eraser::{
    BgEraserError, EncodedImage, EraserConfig, MediaCodec, RemovalBackend, RemovalStrategy,
    UploadProcessor,
};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Encode a gradient image in the requested format
pub fn create_test_image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let intensity = ((x + y) % 100) as u8;
        *pixel = Rgba([intensity, 128, 255 - intensity, 255]);
    }

    let mut buffer = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut buffer, format)
            .unwrap(),
        _ => image.write_to(&mut buffer, format).unwrap(),
    }
    buffer.into_inner()
}

/// A small real PNG
pub fn png_fixture() -> Vec<u8> {
    create_test_image_bytes(32, 32, ImageFormat::Png)
}

/// Bytes the mock services answer with as the "processed" image
pub fn processed_png() -> Vec<u8> {
    create_test_image_bytes(8, 8, ImageFormat::Png)
}

pub fn config_for(temp: &TempDir, strategy: RemovalStrategy, endpoint: &str) -> EraserConfig {
    EraserConfig::builder()
        .storage_root(temp.path())
        .strategy(strategy)
        .endpoint(endpoint)
        .timeout_secs(5)
        .build()
        .unwrap()
}

pub fn files_in(processor: &UploadProcessor, bucket: bg_eraser::Bucket) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(processor.store().bucket_dir(bucket))
        .map(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// In-process backend with a fixed answer
#[derive(Clone)]
pub enum ScriptedBackend {
    Returns(EncodedImage),
    Fails(fn() -> BgEraserError),
    Panics(&'static str),
}

impl ScriptedBackend {
    pub fn png() -> Self {
        Self::Returns(MediaCodec::encode(&processed_png(), "image/png"))
    }
}

#[async_trait]
impl RemovalBackend for ScriptedBackend {
    async fn remove_background(&self, _image: &EncodedImage) -> bg_eraser::types::RemovalResult {
        match self {
            Self::Returns(image) => Ok(image.clone()),
            Self::Fails(make_error) => Err(make_error()),
            Self::Panics(message) => panic!("{}", message),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Behaviour of the mock removal service for `POST /remove`
#[derive(Debug, Clone)]
pub enum ServiceScript {
    /// Answer with an absolute URL to a PNG result
    ResultUrl,
    /// Answer with a URL relative to the service
    RelativeResultUrl,
    /// Answer with this status and body
    Status(u16, String),
    /// Answer with this JSON body
    Body(Value),
    /// Result URL points at a file served with this content type
    ResultWithContentType(String),
    /// Result fetch answers with this status
    ResultStatus(u16),
    /// Result fetch answers 200 with an empty body
    EmptyResult,
    /// Result fetch answers without a `Content-Type` header
    UntypedResult,
    /// Result fetch answers with this many bytes and a `Content-Length`
    OversizedResult(usize),
    /// Result fetch streams this many bytes without a `Content-Length`
    StreamedOversizedResult(usize),
    /// Result URL points at a port nothing listens on
    UnreachableResultUrl,
}

/// What the mock service saw on the upload endpoint
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
struct ServiceState {
    base_url: String,
    script: ServiceScript,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

/// A local stand-in for the background removal service
pub struct MockRemovalService {
    pub base_url: String,
    pub received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl MockRemovalService {
    pub async fn start(script: ServiceScript) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));

        let state = ServiceState {
            base_url: base_url.clone(),
            script,
            received: Arc::clone(&received),
        };
        let router = Router::new()
            .route("/remove", post(remove_handler))
            .route("/results/:name", get(result_handler))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base_url, received }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/remove", self.base_url)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.received.lock().unwrap().clone()
    }
}

async fn remove_handler(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> axum::response::Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let upload = ReceivedUpload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(ToString::to_string),
            content_type: field.content_type().map(ToString::to_string),
            bytes: field.bytes().await.unwrap().to_vec(),
        };
        state.received.lock().unwrap().push(upload);
    }

    match state.script {
        ServiceScript::ResultUrl => Json(json!({
            "data": { "url": format!("{}/results/cutout.png", state.base_url) }
        }))
        .into_response(),
        ServiceScript::RelativeResultUrl => {
            Json(json!({ "data": { "url": "/results/cutout.png" } })).into_response()
        },
        ServiceScript::Status(status, body) => (
            StatusCode::from_u16(status).unwrap(),
            body,
        )
            .into_response(),
        ServiceScript::Body(body) => Json(body).into_response(),
        ServiceScript::UnreachableResultUrl => Json(json!({
            "data": { "url": "http://127.0.0.1:9/results/cutout.png" }
        }))
        .into_response(),
        ServiceScript::ResultWithContentType(_)
        | ServiceScript::ResultStatus(_)
        | ServiceScript::EmptyResult
        | ServiceScript::UntypedResult
        | ServiceScript::OversizedResult(_)
        | ServiceScript::StreamedOversizedResult(_) => Json(json!({
            "data": { "url": format!("{}/results/scripted", state.base_url) }
        }))
        .into_response(),
    }
}

async fn result_handler(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
) -> axum::response::Response {
    if name == "cutout.png" {
        return png_response(processed_png());
    }
    if name != "scripted" {
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.script {
        ServiceScript::ResultWithContentType(content_type) => {
            ([(header::CONTENT_TYPE, content_type)], Bytes::from(processed_png())).into_response()
        },
        ServiceScript::ResultStatus(status) => (
            StatusCode::from_u16(status).unwrap(),
            "result expired",
        )
            .into_response(),
        ServiceScript::EmptyResult => png_response(Vec::new()),
        ServiceScript::UntypedResult => Response::builder()
            .status(StatusCode::OK)
            .body(Body::from(processed_png()))
            .unwrap(),
        ServiceScript::OversizedResult(size) => png_response(vec![0u8; size]),
        ServiceScript::StreamedOversizedResult(size) => {
            let chunks = vec![0u8; size]
                .chunks(256)
                .map(|chunk| Ok::<_, std::io::Error>(Bytes::copy_from_slice(chunk)))
                .collect::<Vec<_>>();
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .unwrap()
        },
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn png_response(bytes: Vec<u8>) -> axum::response::Response {
    ([(header::CONTENT_TYPE, "image/png")], Bytes::from(bytes)).into_response()
}

/// Behaviour of the mock generative model
#[derive(Debug, Clone)]
pub enum ModelScript {
    /// Answer with a text part and an inline PNG
    InlineImage,
    /// Answer with text only
    TextOnly,
    /// Answer with this status
    Status(u16),
}

#[derive(Clone)]
struct ModelState {
    script: ModelScript,
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

/// A local stand-in for a `generateContent` API
pub struct MockGenerativeModel {
    pub api_base: String,
    /// (path after `/models/`, API key header, request body)
    pub requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl MockGenerativeModel {
    pub async fn start(script: ModelScript) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_base = format!("http://{}/v1beta", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = ModelState {
            script,
            requests: Arc::clone(&requests),
        };
        let router = Router::new()
            .route("/v1beta/models/*rest", post(generate_handler))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { api_base, requests }
    }
}

async fn generate_handler(
    State(state): State<ModelState>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    state.requests.lock().unwrap().push((rest, key, body));

    match state.script {
        ModelScript::InlineImage => {
            let data = base64::engine::general_purpose::STANDARD.encode(processed_png());
            Json(json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Here is the image without its background." },
                            { "inlineData": { "mimeType": "image/png", "data": data } }
                        ]
                    }
                }]
            }))
            .into_response()
        },
        ModelScript::TextOnly => Json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot do that." }] }
            }]
        }))
        .into_response(),
        ModelScript::Status(status) => (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({ "error": { "message": "quota exceeded" } })),
        )
            .into_response(),
    }
}
