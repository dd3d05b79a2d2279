//! Pose-specific shape models and the bank they are selected from.

use crate::error::{PinError, Result};
use crate::landmarks::{LandmarkScheme, NUM_CANONICAL};
use crate::types::{Point, Shape};
use crate::yaw::{ModelSelection, YawBuckets};

/// A statistical shape model for one yaw range. Read-only once built, so a
/// bank can be shared across threads.
pub trait ShapeModel: Send + Sync {
    fn scheme(&self) -> &LandmarkScheme;

    fn mean_shape(&self) -> &Shape;

    /// Deform `shape` to a plausible shape under the model while honouring
    /// the used points of `pinned`. Both shapes are in the model's scheme.
    fn conform_to_pinned(&self, shape: &Shape, pinned: &Shape) -> Result<Shape>;
}

/// The simplest usable model: the conformed shape is the input shape with
/// every pinned landmark snapped to its pinned position.
#[derive(Debug, Clone)]
pub struct RigidShapeModel {
    scheme: LandmarkScheme,
    mean_shape: Shape,
}

impl RigidShapeModel {
    pub fn new(scheme: LandmarkScheme, mean_shape: Shape) -> Result<Self> {
        mean_shape.ensure_len(scheme.num_points())?;
        Ok(Self { scheme, mean_shape })
    }
}

impl ShapeModel for RigidShapeModel {
    fn scheme(&self) -> &LandmarkScheme {
        &self.scheme
    }

    fn mean_shape(&self) -> &Shape {
        &self.mean_shape
    }

    fn conform_to_pinned(&self, shape: &Shape, pinned: &Shape) -> Result<Shape> {
        shape.ensure_len(self.scheme.num_points())?;
        pinned.ensure_len(self.scheme.num_points())?;
        let mut out = shape.clone();
        for i in pinned.used_indices() {
            out[i] = pinned[i];
        }
        Ok(out)
    }
}

/// Right-facing models ordered by yaw, index 0 frontal.
pub struct ModelBank {
    models: Vec<Box<dyn ShapeModel>>,
    buckets: YawBuckets,
}

impl ModelBank {
    /// Checks that the bank size has a calibrated bucket table and that all
    /// models share one landmark scheme.
    pub fn new(models: Vec<Box<dyn ShapeModel>>) -> Result<Self> {
        let buckets = YawBuckets::for_model_count(models.len())?;
        let scheme = models[0].scheme();
        for model in &models[1..] {
            if model.scheme() != scheme {
                return Err(PinError::InvalidLandmarkScheme(format!(
                    "bank mixes schemes {} and {}",
                    scheme.name(),
                    model.scheme().name()
                )));
            }
        }
        Ok(Self { models, buckets })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn scheme(&self) -> &LandmarkScheme {
        self.models[0].scheme()
    }

    pub fn frontal(&self) -> &dyn ShapeModel {
        self.models[0].as_ref()
    }

    /// Pick the model for a continuous yaw estimate.
    pub fn select(&self, yaw: f64) -> ModelSelection {
        ModelSelection::from_bucket(self.buckets.bucket(yaw))
    }

    /// The model a selection refers to.
    pub fn model(&self, selection: &ModelSelection) -> &dyn ShapeModel {
        self.models[selection.model_index].as_ref()
    }
}

impl std::fmt::Debug for ModelBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBank")
            .field("models", &self.models.len())
            .field("scheme", &self.scheme().name())
            .finish()
    }
}

/// 3D face template in the canonical 17-point order: x right, y down,
/// z toward the camera. Units are pixels for a face about 90 pixels across
/// the outer eye corners.
const FACE_TEMPLATE_3D: [(f64, f64, f64); NUM_CANONICAL] = [
    (-30.0, 0.0, 0.0),    // LPupil
    (30.0, 0.0, 0.0),     // RPupil
    (-24.0, 66.0, 4.0),   // LMouthCorner
    (24.0, 66.0, 4.0),    // RMouthCorner
    (-48.0, -18.0, -4.0), // LOuterEyeBrow
    (-12.0, -20.0, 2.0),  // LInnerEyeBrow
    (12.0, -20.0, 2.0),   // RInnerEyeBrow
    (48.0, -18.0, -4.0),  // ROuterEyeBrow
    (-66.0, -5.0, -30.0), // LTemple
    (-44.0, 0.0, -4.0),   // LEyeOuter
    (-16.0, 0.0, 0.0),    // LEyeInner
    (16.0, 0.0, 0.0),     // REyeInner
    (44.0, 0.0, -4.0),    // REyeOuter
    (66.0, -5.0, -30.0),  // RTemple
    (0.0, 38.0, 30.0),    // CNoseTip
    (0.0, 58.0, 12.0),    // CTopOfTopLip
    (0.0, 76.0, 10.0),    // CBotOfBotLip
];

/// Nominal yaw of each template bank model, in degrees.
pub const TEMPLATE_YAWS: [f64; 3] = [0.0, 22.0, 45.0];

/// Orthographic projection of the face template turned `yaw_deg` to the right.
pub fn template_mean_shape(yaw_deg: f64) -> Shape {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    Shape::new(
        FACE_TEMPLATE_3D
            .iter()
            .map(|&(x, y, z)| Point::new(x * cos + z * sin, y))
            .collect(),
    )
}

/// A three-model canonical-17 bank built from the face template.
pub fn template_bank() -> Result<ModelBank> {
    let models = TEMPLATE_YAWS
        .iter()
        .map(|&yaw| {
            let model = RigidShapeModel::new(LandmarkScheme::canonical17(), template_mean_shape(yaw))?;
            Ok(Box::new(model) as Box<dyn ShapeModel>)
        })
        .collect::<Result<Vec<_>>>()?;
    ModelBank::new(models)
}
