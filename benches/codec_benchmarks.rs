use async_trait::async_trait;
use bg_eraser::{
    types::RemovalResult, EncodedImage, EraserConfig, MediaCodec, MediaFormatHandler,
    RemovalBackend, UploadProcessor, UploadRequest, UploadValidator,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

/// Backend answering with the input, so the pipeline is measured without network
struct EchoBackend;

#[async_trait]
impl RemovalBackend for EchoBackend {
    async fn remove_background(&self, image: &EncodedImage) -> RemovalResult {
        Ok(image.clone())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

fn payload(size: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend((0..size).map(|i| (i % 251) as u8));
    bytes
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [16 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let bytes = payload(size);
        let encoded = MediaCodec::encode(&bytes, "image/png");
        let data_uri = encoded.to_data_uri();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &bytes, |b, bytes| {
            b.iter(|| MediaCodec::encode(black_box(bytes), "image/png"));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| MediaCodec::decode(black_box(encoded)));
        });
        group.bench_with_input(BenchmarkId::new("decode_data_uri", size), &data_uri, |b, uri| {
            b.iter(|| MediaCodec::decode_data_uri(black_box(uri)));
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let validator = UploadValidator::default();
    let upload = UploadRequest::new(payload(64 * 1024), "Image/PNG; charset=binary", "photo.png");

    c.bench_function("validate_upload", |b| {
        b.iter(|| validator.validate(black_box(Some(&upload))).is_ok());
    });
    c.bench_function("sniff_mime", |b| {
        b.iter(|| MediaFormatHandler::sniff_mime(black_box(&upload.file_bytes)));
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return;
        },
    };
    let temp = std::env::temp_dir().join(format!("bg-eraser-bench-{}", std::process::id()));
    let config = match EraserConfig::builder().storage_root(&temp).build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid benchmark config: {}", e);
            return;
        },
    };
    let processor = UploadProcessor::with_backend(config, Box::new(EchoBackend));
    let bytes = payload(256 * 1024);

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    group.bench_function("process_upload_256k", |b| {
        b.iter(|| {
            let upload = UploadRequest::new(bytes.clone(), "image/png", "bench.png");
            rt.block_on(processor.process_upload(Some(upload)))
        });
    });
    group.finish();

    let _ = std::fs::remove_dir_all(&temp);
}

criterion_group!(benches, bench_codec, bench_validation, bench_pipeline);
criterion_main!(benches);
