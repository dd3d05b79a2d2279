use crate::landmarks::Landmark;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PinError {
    #[error("need at least two pinned landmarks, got {used}")]
    InsufficientConstraints { used: usize },
    #[error("required landmark {0:?} is not set in the shape")]
    MissingRequiredLandmark(Landmark),
    #[error("rotation of {0} degrees is outside [-360, 360]")]
    InvalidRotationRange(f64),
    #[error("shape has {actual} points, expected {expected}")]
    PointCountMismatch { expected: usize, actual: usize },
    #[error("no yaw bucket table for a bank of {0} models (supported: 1 or 3)")]
    UnsupportedModelCount(usize),
    #[error("alignment is degenerate, pinned points coincide")]
    DegenerateAlignment,
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("invalid landmark scheme: {0}")]
    InvalidLandmarkScheme(String),
}

pub type Result<T> = std::result::Result<T, PinError>;
