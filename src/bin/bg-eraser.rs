//! bg-eraser CLI Tool
//!
//! Runs local image files through the upload-and-background-removal pipeline,
//! or serves the pipeline over HTTP with `--serve`.

#[cfg(feature = "cli")]
use bg_eraser::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(2);
}
