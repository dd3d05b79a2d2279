//! Detector parameters: face placement and pose in the form a face detector
//! reports it, so pinned and detected faces are handled the same way
//! downstream.

use crate::error::{PinError, Result};
use crate::landmarks::{Landmark, NUM_CANONICAL};
use crate::types::{mirror_x, Point, Shape};
use crate::yaw::YawBucket;
use serde::{Deserialize, Serialize};

// Calibration shared with the face detector; ROI sizing depends on these.
const EYE_WEIGHT: f64 = 0.7;
const MOUTH_WEIGHT: f64 = 0.3;
const EYE_MOUTH_TO_FACE_SIZE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParameter {
    /// Face centre.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// In-plane rotation in degrees, positive anticlockwise.
    pub rot: f64,
    /// Continuous yaw in degrees, positive right-facing.
    pub yaw: f64,
    pub bucket: YawBucket,
    pub left_eye: Option<Point>,
    pub right_eye: Option<Point>,
    pub mouth: Option<Point>,
}

impl DetectorParameter {
    /// Back-compute detector parameters from a canonical 17-point shape.
    ///
    /// Needs both pupils and the bottom of the bottom lip. The face centre
    /// sits 30% of the way from the eye midpoint to the mouth and the face
    /// is twice the eye-to-mouth distance across.
    pub fn from_canonical17(shape17: &Shape, rot: f64, yaw: f64, bucket: YawBucket) -> Result<Self> {
        shape17.ensure_len(NUM_CANONICAL)?;
        let required = |lm: Landmark| {
            let p = shape17[lm.index()];
            if p.is_used() {
                Ok(p)
            } else {
                Err(PinError::MissingRequiredLandmark(lm))
            }
        };
        let left_eye = required(Landmark::LPupil)?;
        let right_eye = required(Landmark::RPupil)?;
        let mouth = required(Landmark::CBotOfBotLip)?;

        let eye_mid = left_eye.midpoint(&right_eye);
        let size = EYE_MOUTH_TO_FACE_SIZE * eye_mid.distance(&mouth);

        Ok(Self {
            x: EYE_WEIGHT * eye_mid.x + MOUTH_WEIGHT * mouth.x,
            y: EYE_WEIGHT * eye_mid.y + MOUTH_WEIGHT * mouth.y,
            width: size,
            height: size,
            rot,
            yaw,
            bucket,
            left_eye: Some(left_eye),
            right_eye: Some(right_eye),
            mouth: Some(mouth),
        })
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Overwrite the eye and mouth fields with whichever of those points the
    /// shape has.
    pub fn fill_eyes_mouth(&mut self, shape17: &Shape) -> Result<()> {
        shape17.ensure_len(NUM_CANONICAL)?;
        let used = |lm: Landmark| Some(shape17[lm.index()]).filter(Point::is_used);
        if let Some(p) = used(Landmark::LPupil) {
            self.left_eye = Some(p);
        }
        if let Some(p) = used(Landmark::RPupil) {
            self.right_eye = Some(p);
        }
        if let Some(p) = used(Landmark::CBotOfBotLip) {
            self.mouth = Some(p);
        }
        Ok(())
    }

    /// Reflect the placement about the centre of an image `image_width`
    /// pixels wide, swapping the eyes. Pose angles are left untouched.
    pub fn flip_position(&self, image_width: u32) -> Self {
        let flip = |p: Point| Point::new(mirror_x(p.x, image_width), p.y).keep_used();
        Self {
            x: mirror_x(self.x, image_width),
            left_eye: self.right_eye.map(flip),
            right_eye: self.left_eye.map(flip),
            mouth: self.mouth.map(flip),
            ..*self
        }
    }
}
