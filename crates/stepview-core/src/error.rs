//! Error types for Stepview

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Invalid pose: expected 16 values, got {0}")]
    InvalidPose(usize),
    #[error("Step {step} out of range (total {total})")]
    StepOutOfRange { step: u32, total: u32 },
}

/// Result type alias for Stepview operations
pub type Result<T> = std::result::Result<T, ViewerError>;
