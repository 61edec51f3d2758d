use std::path::PathBuf;

/// Failures while classifying a single image. Each one is turned into a
/// `PredictionFailure` body by the engine and never reaches the transport as a fault.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("Inference error: {0}")]
    Inference(String),
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: usize, limit: usize },
}

#[cfg(feature = "torch")]
impl From<tch::TchError> for PredictionError {
    fn from(err: tch::TchError) -> Self {
        PredictionError::Inference(err.to_string())
    }
}

/// Reasons the trained model could not be brought up at startup. None of them
/// are fatal: the service falls back to the simulation path.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Inference framework not compiled in (enable the `torch` feature)")]
    FrameworkUnavailable,
    #[error("Model file not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("Error loading model: {0}")]
    Load(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port '{value}': {source}")]
    InvalidPort {
        value: String,
        source: std::num::ParseIntError,
    },
    #[error("Failed to resolve deployment root: {0}")]
    DeploymentRoot(#[from] std::io::Error),
}
