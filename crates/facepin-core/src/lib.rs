//! facepin-core — Start shapes and face ROIs from manually pinned landmarks.
//!
//! Estimates in-plane rotation and yaw from as few as two pinned points,
//! picks the matching pose-specific shape model (mirroring left-facing faces
//! onto right-facing models), aligns and conforms the model's mean shape, and
//! synthesizes detector parameters in both the image and the ROI frame.

pub mod alignment;
pub mod detpar;
mod error;
pub mod landmarks;
pub mod model;
pub mod pinning;
pub mod pose;
pub mod roi;
pub mod start;
pub mod types;
pub mod yaw;

pub use alignment::Transform2D;
pub use detpar::DetectorParameter;
pub use error::{PinError, Result};
pub use landmarks::{Landmark, LandmarkScheme};
pub use model::{template_bank, ModelBank, RigidShapeModel, ShapeModel};
pub use pose::{estimate_pose, PoseEstimate};
pub use roi::{RoiExtractor, UprightRoi};
pub use start::{pinned_start_shape_and_roi, pinned_start_shape_and_roi_with, PinnedStart};
pub use types::{Point, Shape};
pub use yaw::{ModelSelection, YawBucket, YawBuckets};
