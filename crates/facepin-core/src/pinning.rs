//! Aligning a model's mean shape to pinned landmarks, and reducing pinned
//! landmarks to the five pose points.

use crate::alignment::Transform2D;
use crate::error::{PinError, Result};
use crate::landmarks::{pose_points, Landmark, LandmarkScheme};
use crate::types::{Point, Shape};

pub use crate::types::XJITTER;

/// Move points sitting exactly at the origin to `(XJITTER, XJITTER)`.
pub fn jitter_points_at_origin(mut shape: Shape) -> Shape {
    for p in shape.points.iter_mut() {
        *p = p.keep_used();
    }
    shape
}

/// Align `mean_shape` to the used points of `pinned`.
///
/// The similarity transform is fitted on the pinned points only and then
/// applied to the whole mean shape, which places the unpinned landmarks.
pub fn align_mean_shape(pinned: &Shape, mean_shape: &Shape) -> Result<Shape> {
    pinned.ensure_len(mean_shape.len())?;

    let used: Vec<usize> = pinned.used_indices().collect();
    if used.len() < 2 {
        return Err(PinError::InsufficientConstraints { used: used.len() });
    }

    let mean_used: Vec<Point> = used.iter().map(|&i| mean_shape[i]).collect();
    let pinned_used: Vec<Point> = used.iter().map(|&i| pinned[i]).collect();
    let transform = Transform2D::similarity(&mean_used, &pinned_used)?;

    Ok(jitter_points_at_origin(transform.apply_all(mean_shape)))
}

/// Reduce `pinned` (in `scheme`) to the five pose points.
///
/// The points are copied when all five are pinned. Otherwise they are read
/// off the canonical mean shape aligned to whatever canonical points are
/// pinned; the pose regression was trained on exact points, so imputed ones
/// give a rougher estimate.
pub fn pose_shape(pinned: &Shape, mean_shape: &Shape, scheme: &LandmarkScheme) -> Result<[Point; 5]> {
    let pinned17 = scheme.to_canonical17(pinned)?;
    let mean17 = scheme.to_canonical17(mean_shape)?;

    if Landmark::POSE.iter().all(|lm| pinned17.is_used(lm.index())) {
        return Ok(pose_points(&pinned17));
    }

    if let Some(lm) = Landmark::POSE.iter().find(|lm| !mean17.is_used(lm.index())) {
        return Err(PinError::MissingRequiredLandmark(*lm));
    }

    // Only canonical points the mean shape also has can anchor the alignment.
    let mut anchors = pinned17.clone();
    for (i, p) in anchors.points.iter_mut().enumerate() {
        if !mean17.is_used(i) {
            *p = Point::UNUSED;
        }
    }

    tracing::warn!(
        scheme = scheme.name(),
        pinned = anchors.used_count(),
        "pose points not all pinned, imputing them from the mean shape"
    );
    let imputed = align_mean_shape(&anchors, &mean17)?;
    Ok(pose_points(&imputed))
}
