//! Start shape and face ROI from manually pinned landmarks.
//!
//! Used when no face detector result is available: pose comes from the
//! pinned points, the pose-specific model's mean shape is aligned to them and
//! conformed, and detector parameters are synthesized from the result so the
//! rest of the pipeline can treat the face like a detected one.

use crate::detpar::DetectorParameter;
use crate::error::Result;
use crate::model::ModelBank;
use crate::pinning::{align_mean_shape, pose_shape};
use crate::pose::{estimate_pose, PoseEstimate};
use crate::roi::{RoiExtractor, UprightRoi};
use crate::types::Shape;
use crate::yaw::ModelSelection;
use image::GrayImage;

/// Everything produced from one set of pinned landmarks.
#[derive(Debug, Clone)]
pub struct PinnedStart {
    /// Conformed start shape in the ROI frame. For left-facing faces this is
    /// the mirrored face, as the models expect right-facing input.
    pub start_shape: Shape,
    /// The pinned landmarks in the same frame as `start_shape`.
    pub pinned_roi: Shape,
    /// Upright crop around the face (mirrored for left-facing faces).
    pub face_roi: GrayImage,
    /// Detector parameters relative to `face_roi`.
    pub detpar_roi: DetectorParameter,
    /// Detector parameters relative to the original image.
    pub detpar: DetectorParameter,
    pub pose: PoseEstimate,
    pub selection: ModelSelection,
}

/// [`pinned_start_shape_and_roi_with`] using the default [`UprightRoi`].
pub fn pinned_start_shape_and_roi(image: &GrayImage, bank: &ModelBank, pinned: &Shape) -> Result<PinnedStart> {
    pinned_start_shape_and_roi_with(image, bank, pinned, &UprightRoi::default())
}

/// Build the start shape and ROI for `pinned`, a shape in the bank's landmark
/// scheme with at least two points set.
pub fn pinned_start_shape_and_roi_with<R: RoiExtractor + ?Sized>(
    image: &GrayImage,
    bank: &ModelBank,
    pinned: &Shape,
    roi: &R,
) -> Result<PinnedStart> {
    let scheme = bank.scheme();
    pinned.ensure_len(scheme.num_points())?;

    let pose = estimate_pose(&pose_shape(pinned, bank.frontal().mean_shape(), scheme)?);
    let selection = bank.select(pose.yaw);
    tracing::debug!(
        bucket = %selection.bucket,
        model = selection.model_index,
        mirror = selection.mirror,
        yaw = pose.yaw,
        rot = pose.rot,
        "selected shape model"
    );

    // Models are right-facing only, so left-facing faces are worked on mirrored.
    let mut work_img = image.clone();
    let mut work_pinned = pinned.clone();
    if selection.mirror {
        work_pinned = scheme.mirror(&work_pinned, image.width())?;
        image::imageops::flip_horizontal_in_place(&mut work_img);
    }

    let model = bank.model(&selection);
    let aligned = align_mean_shape(&work_pinned, model.mean_shape())?;
    let start_shape = model.conform_to_pinned(&aligned, &work_pinned)?;

    let start17 = scheme.to_canonical17(&start_shape)?;
    let rot = if selection.mirror { -pose.rot } else { pose.rot };
    let mut detpar = DetectorParameter::from_canonical17(&start17, rot, pose.yaw, selection.bucket)?;

    let (face_roi, mut detpar_roi) = roi.face_roi(&work_img, &detpar, false)?;
    let start_shape = roi.to_roi_frame(&start_shape, &detpar_roi, &detpar)?;
    let pinned_roi = roi.to_roi_frame(&work_pinned, &detpar_roi, &detpar)?;

    // Not needed downstream, kept so ROI detpars always carry eyes and mouth.
    detpar_roi.fill_eyes_mouth(&scheme.to_canonical17(&start_shape)?)?;

    if selection.mirror {
        detpar = detpar.flip_position(image.width());
        detpar.rot = -detpar.rot;
        detpar_roi.x += 2.0 * (f64::from(face_roi.width()) / 2.0 - detpar_roi.x);
    }

    Ok(PinnedStart {
        start_shape,
        pinned_roi,
        face_roi,
        detpar_roi,
        detpar,
        pose,
        selection,
    })
}
