//! In-plane rotation and yaw from the five pose landmarks.
//!
//! Yaw comes from an additive piecewise-linear regression over the
//! de-rotated, centred, unit-norm 5-point shape. The trained model is kept as
//! a coefficient table and evaluated by [`HingeModel::evaluate`].

use crate::alignment::Transform2D;
use crate::types::{flatten, mean_point, Point};
use serde::{Deserialize, Serialize};

/// Rotations smaller than this (degrees) are reported as exactly zero.
pub const ROT_TREAT_AS_ZERO: f64 = 5.0;

/// One hinge function of a single input variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hinge {
    /// `max(0, x[var] - knot)`
    Above { var: usize, knot: f64 },
    /// `max(0, knot - x[var])`
    Below { var: usize, knot: f64 },
}

impl Hinge {
    pub fn eval(&self, x: &[f64]) -> f64 {
        match *self {
            Hinge::Above { var, knot } => (x[var] - knot).max(0.0),
            Hinge::Below { var, knot } => (knot - x[var]).max(0.0),
        }
    }
}

/// A regression term: coefficient times the product of its hinges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub coef: f64,
    pub hinges: &'static [Hinge],
}

/// Intercept plus a sum of hinge and hinge-product terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HingeModel {
    pub intercept: f64,
    pub terms: &'static [Term],
}

impl HingeModel {
    /// Number of inputs the terms reference.
    pub fn num_inputs(&self) -> usize {
        self.terms
            .iter()
            .flat_map(|t| t.hinges)
            .map(|h| match *h {
                Hinge::Above { var, .. } | Hinge::Below { var, .. } => var + 1,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn evaluate(&self, x: &[f64]) -> f64 {
        debug_assert!(x.len() >= self.num_inputs());
        self.intercept
            + self
                .terms
                .iter()
                .map(|t| t.coef * t.hinges.iter().map(|h| h.eval(x)).product::<f64>())
                .sum::<f64>()
    }
}

const fn above(var: usize, knot: f64) -> Hinge {
    Hinge::Above { var, knot }
}

const fn below(var: usize, knot: f64) -> Hinge {
    Hinge::Below { var, knot }
}

/// Yaw (degrees) from the flattened, normalized 5-point shape
/// `[x0, y0, ..., x4, y4]`. Trained on shapes and their reflections;
/// positive yaw is a right-facing head.
pub const YAW_MODEL: HingeModel = HingeModel {
    intercept: 34.342,
    terms: &[
        Term { coef: -7.0267, hinges: &[above(3, -0.34708)] },
        Term { coef: 10.739, hinges: &[below(3, -0.34708)] },
        Term { coef: 116.29, hinges: &[above(4, 0.21454)] },
        Term { coef: -159.56, hinges: &[below(4, 0.21454)] },
        Term { coef: 12.513, hinges: &[above(7, 0.3384)] },
        Term { coef: 7.2764, hinges: &[below(7, 0.3384)] },
        Term { coef: 260.14, hinges: &[above(3, -0.34708), above(5, -0.010838)] },
        Term { coef: -160.64, hinges: &[above(3, -0.34708), below(5, -0.010838)] },
        Term { coef: -284.88, hinges: &[below(3, -0.34708), above(5, -0.055581)] },
        Term { coef: 654.54, hinges: &[below(3, -0.34708), below(5, -0.055581)] },
    ],
};

/// Head pose estimated from pinned landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// In-plane rotation in degrees, positive anticlockwise.
    pub rot: f64,
    /// Yaw in degrees, positive right-facing.
    pub yaw: f64,
}

/// Zero out rotations within [`ROT_TREAT_AS_ZERO`] of upright.
pub fn snap_rotation(rot: f64) -> f64 {
    if rot.abs() < ROT_TREAT_AS_ZERO {
        0.0
    } else {
        rot
    }
}

/// Estimate rotation and yaw from the five pose points, ordered
/// LEyeOuter, REyeOuter, CNoseTip, LMouthCorner, RMouthCorner.
pub fn estimate_pose(shape5: &[Point; 5]) -> PoseEstimate {
    let [leye, reye, ..] = *shape5;
    let rot = snap_rotation(-(reye.y - leye.y).atan2(reye.x - leye.x).to_degrees());

    let centroid = mean_point(shape5);

    // Derotate about the centroid using the eye angle.
    let mut work = *shape5;
    if rot != 0.0 {
        let derotate = Transform2D::rotation_unchecked(centroid, -rot);
        work = work.map(|p| derotate.apply(p));
    }

    let mean = mean_point(&work);
    let centred = work.map(|p| p - mean);

    let norm = centred.iter().map(|p| p.x * p.x + p.y * p.y).sum::<f64>().sqrt();
    let flat = flatten(&centred.map(|p| p * (1.0 / norm)));

    let yaw = YAW_MODEL.evaluate(&flat);
    tracing::debug!(rot, yaw, "estimated pose from pinned landmarks");

    PoseEstimate { rot, yaw }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frontal, upright pose points.
    fn frontal() -> [Point; 5] {
        [
            Point::new(56.0, 80.0),
            Point::new(144.0, 80.0),
            Point::new(100.0, 118.0),
            Point::new(76.0, 146.0),
            Point::new(124.0, 146.0),
        ]
    }

    fn rotate(points: [Point; 5], deg: f64) -> [Point; 5] {
        let t = Transform2D::rotation_unchecked(Point::new(100.0, 100.0), deg);
        points.map(|p| t.apply(p))
    }

    #[test]
    fn test_hinge_eval() {
        let x = [0.5, -0.2];
        assert_eq!(above(0, 0.25).eval(&x), 0.25);
        assert_eq!(above(1, 0.0).eval(&x), 0.0);
        assert!((below(1, 0.0).eval(&x) - 0.2).abs() < 1e-12);
        assert_eq!(below(0, 0.0).eval(&x), 0.0);
    }

    #[test]
    fn test_model_intercept_only_when_hinges_inactive() {
        const MODEL: HingeModel = HingeModel {
            intercept: 3.0,
            terms: &[
                Term { coef: 2.0, hinges: &[above(0, 1.0)] },
                Term { coef: 5.0, hinges: &[above(0, 0.0), below(1, 0.0)] },
            ],
        };
        assert_eq!(MODEL.num_inputs(), 2);
        assert_eq!(MODEL.evaluate(&[0.5, 1.0]), 3.0);
        // 3 + 2 * 1 + 5 * (2 * 0.5)
        assert!((MODEL.evaluate(&[2.0, -0.5]) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_yaw_model_uses_ten_inputs_or_fewer() {
        assert!(YAW_MODEL.num_inputs() <= 10);
        assert_eq!(YAW_MODEL.terms.len(), 10);
    }

    #[test]
    fn test_frontal_pose() {
        let pose = estimate_pose(&frontal());
        assert_eq!(pose.rot, 0.0);
        assert!(pose.yaw.abs() < 2.0, "yaw = {}", pose.yaw);
    }

    #[test]
    fn test_small_rotation_snaps_to_zero() {
        for deg in [-4.9, -1.0, 0.3, 3.0, 4.9] {
            let pose = estimate_pose(&rotate(frontal(), deg));
            assert_eq!(pose.rot, 0.0, "rotation {deg} should snap to zero");
        }
        assert_eq!(snap_rotation(4.999), 0.0);
        assert_eq!(snap_rotation(-5.0), -5.0);
    }

    #[test]
    fn test_rotation_sign_and_derotation() {
        let upright = estimate_pose(&frontal());
        for deg in [10.0, -20.0, 45.0] {
            let pose = estimate_pose(&rotate(frontal(), deg));
            assert!((pose.rot - deg).abs() < 1e-9, "rot = {}, want {deg}", pose.rot);
            // Yaw is computed on the derotated shape, so rotation does not leak in.
            assert!(
                (pose.yaw - upright.yaw).abs() < 1e-6,
                "yaw {} drifted from {}",
                pose.yaw,
                upright.yaw
            );
        }
    }

    #[test]
    fn test_yaw_is_scale_and_translation_invariant() {
        let base = estimate_pose(&frontal());
        let moved = frontal().map(|p| p * 3.0 + Point::new(-40.0, 25.0));
        let pose = estimate_pose(&moved);
        assert!((pose.yaw - base.yaw).abs() < 1e-9);
    }

    #[test]
    fn test_turned_face_yaw_sign() {
        // Nose shifted toward the viewer's right: head turned right.
        let mut right = frontal();
        right[2].x += 20.0;
        right[0].x += 12.0;
        right[3].x += 8.0;
        let mut left = frontal();
        left[2].x -= 20.0;
        left[1].x -= 12.0;
        left[4].x -= 8.0;
        let r = estimate_pose(&right).yaw;
        let l = estimate_pose(&left).yaw;
        assert!(r > 10.0, "right-facing yaw = {r}");
        assert!(l < -10.0, "left-facing yaw = {l}");
    }
}
