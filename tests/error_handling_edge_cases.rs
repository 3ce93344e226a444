//! Error conditions, edge cases and boundary conditions of the upload pipeline

mod common;

use bg_eraser::{
    BgEraserError, Bucket, EraserConfig, ErrorKind, MediaCodec, PipelineStage, RemovalStrategy,
    UploadProcessor, UploadRequest,
};
use common::{files_in, png_fixture, ScriptedBackend};
use tempfile::TempDir;

fn processor_with(temp: &TempDir, backend: ScriptedBackend) -> UploadProcessor {
    let config = EraserConfig::builder()
        .storage_root(temp.path())
        .build()
        .unwrap();
    UploadProcessor::with_backend(config, Box::new(backend))
}

#[test]
fn test_config_validation_edge_cases() {
    // Builder clamps out-of-range values
    let config = EraserConfig::builder()
        .max_upload_bytes(u64::MAX)
        .timeout_secs(0)
        .build()
        .unwrap();
    assert_eq!(config.validation.max_upload_bytes, 100 * 1024 * 1024);
    assert_eq!(config.removal.timeout_secs, 1);

    // Manual construction is validated explicitly
    let mut config = EraserConfig::default();
    config.validation.max_upload_bytes = 0;
    assert!(config.validate().is_err());

    let mut config = EraserConfig::default();
    config.validation.accepted_mime_types.clear();
    assert!(config.validate().is_err());

    let mut config = EraserConfig::default();
    config.removal.endpoint = "ftp://example.com/remove".to_string();
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedError);

    // The endpoint is only checked for the strategy that uses it
    let mut config = EraserConfig::default();
    config.removal.strategy = RemovalStrategy::GenerativeModel;
    config.removal.endpoint = "not a url".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_generative_strategy_requires_api_key() {
    let temp = TempDir::new().unwrap();
    let config = EraserConfig::builder()
        .storage_root(temp.path())
        .strategy(RemovalStrategy::GenerativeModel)
        .api_key(None)
        .build()
        .unwrap();

    let err = UploadProcessor::new(config).unwrap_err();
    assert!(err.to_string().contains("API key"));
}

#[tokio::test]
async fn test_missing_and_empty_uploads() {
    let temp = TempDir::new().unwrap();
    let processor = processor_with(&temp, ScriptedBackend::png());

    let outcome = processor.process_upload(None).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingFile));
    assert_eq!(outcome.error_detail(), Some("No image file provided."));
    assert_eq!(outcome.failed_at(), Some(PipelineStage::Start));

    let empty = UploadRequest::new(Vec::new(), "image/png", "empty.png");
    let outcome = processor.process_upload(Some(empty)).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingFile));

    assert!(files_in(&processor, Bucket::Input).is_empty());
}

#[tokio::test]
async fn test_size_boundary() {
    let temp = TempDir::new().unwrap();
    let config = EraserConfig::builder()
        .storage_root(temp.path())
        .max_upload_bytes(1024)
        .build()
        .unwrap();
    let processor = UploadProcessor::with_backend(config, Box::new(ScriptedBackend::png()));

    let at_limit = UploadRequest::new(vec![0u8; 1024], "image/png", "limit.png");
    let outcome = processor.process_upload(Some(at_limit)).await;
    assert!(outcome.is_success(), "{outcome:?}");

    let over = UploadRequest::new(vec![0u8; 1025], "image/png", "over.png");
    let outcome = processor.process_upload(Some(over)).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::TooLarge));
    assert!(outcome.original_artifact().is_none());
    assert!(outcome.error_detail().unwrap().contains("1025"));
}

#[tokio::test]
async fn test_type_is_checked_before_size() {
    let temp = TempDir::new().unwrap();
    let config = EraserConfig::builder()
        .storage_root(temp.path())
        .max_upload_bytes(10)
        .build()
        .unwrap();
    let processor = UploadProcessor::with_backend(config, Box::new(ScriptedBackend::png()));

    let upload = UploadRequest::new(vec![0u8; 100], "image/gif", "big.gif");
    let outcome = processor.process_upload(Some(upload)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::UnsupportedType));
}

#[tokio::test]
async fn test_declared_mime_is_normalized() {
    let temp = TempDir::new().unwrap();
    let processor = processor_with(&temp, ScriptedBackend::png());

    for declared in ["IMAGE/PNG", "image/png; charset=binary", " image/jpg "] {
        let upload = UploadRequest::new(png_fixture(), declared, "photo");
        let outcome = processor.process_upload(Some(upload)).await;
        assert!(outcome.is_success(), "{declared}: {outcome:?}");
    }

    for declared in ["", "image", "image/webp", "text/plain"] {
        let upload = UploadRequest::new(png_fixture(), declared, "photo.png");
        let outcome = processor.process_upload(Some(upload)).await;
        assert_eq!(
            outcome.error_kind(),
            Some(ErrorKind::UnsupportedType),
            "{declared}"
        );
    }
}

#[tokio::test]
async fn test_content_verification() {
    let temp = TempDir::new().unwrap();
    let config = EraserConfig::builder()
        .storage_root(temp.path())
        .verify_content(true)
        .build()
        .unwrap();
    let processor = UploadProcessor::with_backend(config, Box::new(ScriptedBackend::png()));

    let disguised = UploadRequest::new(b"%PDF-1.4 not an image".to_vec(), "image/png", "x.png");
    let outcome = processor.process_upload(Some(disguised)).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::UnsupportedType));

    let genuine = UploadRequest::new(png_fixture(), "image/png", "x.png");
    let outcome = processor.process_upload(Some(genuine)).await;
    assert!(outcome.is_success(), "{outcome:?}");
}

#[tokio::test]
async fn test_backend_panic_is_contained() {
    let temp = TempDir::new().unwrap();
    let processor = processor_with(&temp, ScriptedBackend::Panics("backend blew up"));

    let outcome = processor
        .process_upload(Some(UploadRequest::new(png_fixture(), "image/png", "a.png")))
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::UnexpectedError));
    assert!(outcome.error_detail().unwrap().contains("backend blew up"));
    assert!(outcome.original_artifact().is_some());

    // The processor stays usable after a panic
    let outcome = processor.process_upload(None).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingFile));
}

#[tokio::test]
async fn test_backend_errors_keep_original() {
    let cases: [(fn() -> BgEraserError, ErrorKind); 4] = [
        (|| BgEraserError::transport("connection reset"), ErrorKind::TransportError),
        (
            || BgEraserError::malformed_response("not json"),
            ErrorKind::MalformedResponse,
        ),
        (
            || BgEraserError::empty_result("No processed image URL was returned."),
            ErrorKind::EmptyResult,
        ),
        (|| BgEraserError::remote_status(503, "busy"), ErrorKind::RemoteStatusError),
    ];

    for (make_error, kind) in cases {
        let temp = TempDir::new().unwrap();
        let processor = processor_with(&temp, ScriptedBackend::Fails(make_error));

        let outcome = processor
            .process_upload(Some(UploadRequest::new(png_fixture(), "image/png", "a.png")))
            .await;

        assert_eq!(outcome.error_kind(), Some(kind));
        assert!(outcome.is_partial_success());
        assert!(outcome.processed_artifact().is_none());
        assert_eq!(files_in(&processor, Bucket::Input).len(), 1);
        assert!(files_in(&processor, Bucket::Output).is_empty());
    }
}

#[tokio::test]
async fn test_long_remote_bodies_are_truncated() {
    let temp = TempDir::new().unwrap();
    let processor = processor_with(
        &temp,
        ScriptedBackend::Fails(|| BgEraserError::remote_status(500, &"x".repeat(10_000))),
    );

    let outcome = processor
        .process_upload(Some(UploadRequest::new(png_fixture(), "image/png", "a.png")))
        .await;

    assert!(outcome.error_detail().unwrap().chars().count() <= 500);
}

#[tokio::test]
async fn test_undecodable_backend_result() {
    let temp = TempDir::new().unwrap();
    let bad = bg_eraser::EncodedImage {
        mime_type: "image/png".to_string(),
        base64_payload: "%%%".to_string(),
    };
    let processor = processor_with(&temp, ScriptedBackend::Returns(bad));

    let outcome = processor
        .process_upload(Some(UploadRequest::new(png_fixture(), "image/png", "a.png")))
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::MalformedEncoding));
    assert_eq!(outcome.failed_at(), Some(PipelineStage::RemovalCompleted));
    assert!(outcome.original_artifact().is_some());
}

#[tokio::test]
async fn test_storage_root_is_a_file() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"occupied").unwrap();
    let config = EraserConfig::builder().storage_root(&blocker).build().unwrap();
    let processor = UploadProcessor::with_backend(config, Box::new(ScriptedBackend::png()));

    let outcome = processor
        .process_upload(Some(UploadRequest::new(png_fixture(), "image/png", "a.png")))
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::StorageWriteFailed));
    assert!(outcome.original_artifact().is_none());
    assert!(outcome.status_message().is_none());
}

#[test]
fn test_data_uri_edge_cases() {
    let decoded = MediaCodec::decode_data_uri("data:image/png;base64,aGk=").unwrap();
    assert_eq!(decoded.bytes, b"hi");
    assert_eq!(decoded.mime_type, "image/png");

    // Unknown MIME falls back to octet-stream
    let decoded = MediaCodec::decode_data_uri("data:;base64,aGk=").unwrap();
    assert_eq!(decoded.mime_type, "application/octet-stream");

    for bad in ["data:image/png;base64", "a,b,c", "data:image/png,aGk=", "data:image/png;base64,@@"] {
        let err = MediaCodec::decode_data_uri(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEncoding, "{bad}");
    }
}

#[test]
fn test_error_kind_status_mapping() {
    assert_eq!(ErrorKind::MissingFile.http_status(), 400);
    assert_eq!(ErrorKind::UnsupportedType.http_status(), 400);
    assert_eq!(ErrorKind::TooLarge.http_status(), 413);
    assert_eq!(ErrorKind::RemoteStatusError.http_status(), 502);
    assert_eq!(ErrorKind::StorageWriteFailed.http_status(), 500);
    assert!(ErrorKind::TooLarge.is_rejection());
    assert!(!ErrorKind::EmptyResult.is_rejection());
}
