//! Services used by the upload pipeline

pub mod codec;
pub mod format;
pub mod progress;
pub mod storage;

pub use codec::MediaCodec;
pub use format::MediaFormatHandler;
pub use progress::{
    drive_simulated_progress, ConsoleProgressReporter, NoOpProgressReporter, ProgressReporter,
    ProgressTracker, ProgressUpdate, SimulatedUploadProgress,
};
pub use storage::ArtifactStore;
