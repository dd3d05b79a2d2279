//! Landmark schemes and the canonical 17-point exchange format.
//!
//! Every scheme carries an explicit table mapping it onto the 17 canonical
//! slots, plus a mirror-partner table used when a shape is flipped
//! horizontally (the left eye of a mirrored face is its right eye).

use crate::error::{PinError, Result};
use crate::types::{mirror_x, Point, Shape};
use serde::{Deserialize, Serialize};

/// Canonical landmark slots. "L" is the viewer's left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Landmark {
    LPupil,
    RPupil,
    LMouthCorner,
    RMouthCorner,
    LOuterEyeBrow,
    LInnerEyeBrow,
    RInnerEyeBrow,
    ROuterEyeBrow,
    LTemple,
    LEyeOuter,
    LEyeInner,
    REyeInner,
    REyeOuter,
    RTemple,
    CNoseTip,
    CTopOfTopLip,
    CBotOfBotLip,
}

pub const NUM_CANONICAL: usize = 17;

impl Landmark {
    pub const ALL: [Landmark; NUM_CANONICAL] = [
        Landmark::LPupil,
        Landmark::RPupil,
        Landmark::LMouthCorner,
        Landmark::RMouthCorner,
        Landmark::LOuterEyeBrow,
        Landmark::LInnerEyeBrow,
        Landmark::RInnerEyeBrow,
        Landmark::ROuterEyeBrow,
        Landmark::LTemple,
        Landmark::LEyeOuter,
        Landmark::LEyeInner,
        Landmark::REyeInner,
        Landmark::REyeOuter,
        Landmark::RTemple,
        Landmark::CNoseTip,
        Landmark::CTopOfTopLip,
        Landmark::CBotOfBotLip,
    ];

    /// The five points the pose regression was trained on, in its input order.
    pub const POSE: [Landmark; 5] = [
        Landmark::LEyeOuter,
        Landmark::REyeOuter,
        Landmark::CNoseTip,
        Landmark::LMouthCorner,
        Landmark::RMouthCorner,
    ];

    /// Row of this slot in a canonical 17-point shape.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The slot this landmark turns into when the face is mirrored.
    pub const fn partner(self) -> Landmark {
        use Landmark::*;
        match self {
            LPupil => RPupil,
            RPupil => LPupil,
            LMouthCorner => RMouthCorner,
            RMouthCorner => LMouthCorner,
            LOuterEyeBrow => ROuterEyeBrow,
            ROuterEyeBrow => LOuterEyeBrow,
            LInnerEyeBrow => RInnerEyeBrow,
            RInnerEyeBrow => LInnerEyeBrow,
            LTemple => RTemple,
            RTemple => LTemple,
            LEyeOuter => REyeOuter,
            REyeOuter => LEyeOuter,
            LEyeInner => REyeInner,
            REyeInner => LEyeInner,
            CNoseTip => CNoseTip,
            CTopOfTopLip => CTopOfTopLip,
            CBotOfBotLip => CBotOfBotLip,
        }
    }
}

/// Where a canonical slot comes from in a given scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanonicalSource {
    Missing,
    Point(usize),
    /// Mean of several scheme points; unused unless all of them are set.
    Mean(&'static [usize]),
}

/// A landmark annotation scheme with its canonical-17 mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkScheme {
    name: &'static str,
    num_points: usize,
    canonical: [CanonicalSource; NUM_CANONICAL],
    partners: Vec<usize>,
}

impl LandmarkScheme {
    /// Build a scheme, validating that every index is in range and that the
    /// partner table is an involution.
    pub fn new(
        name: &'static str,
        num_points: usize,
        canonical: [CanonicalSource; NUM_CANONICAL],
        partners: Vec<usize>,
    ) -> Result<Self> {
        if partners.len() != num_points {
            return Err(PinError::InvalidLandmarkScheme(format!(
                "{name}: partner table has {} entries for {num_points} points",
                partners.len()
            )));
        }
        for (i, &p) in partners.iter().enumerate() {
            if p >= num_points || partners[p] != i {
                return Err(PinError::InvalidLandmarkScheme(format!(
                    "{name}: point {i} has inconsistent mirror partner {p}"
                )));
            }
        }
        for source in &canonical {
            let in_range = match *source {
                CanonicalSource::Missing => true,
                CanonicalSource::Point(i) => i < num_points,
                CanonicalSource::Mean(ids) => !ids.is_empty() && ids.iter().all(|&i| i < num_points),
            };
            if !in_range {
                return Err(PinError::InvalidLandmarkScheme(format!(
                    "{name}: canonical source {source:?} out of range"
                )));
            }
        }
        Ok(Self {
            name,
            num_points,
            canonical,
            partners,
        })
    }

    /// The five pose points, in `Landmark::POSE` order.
    pub fn pose5() -> Self {
        let mut canonical = [CanonicalSource::Missing; NUM_CANONICAL];
        for (i, lm) in Landmark::POSE.iter().enumerate() {
            canonical[lm.index()] = CanonicalSource::Point(i);
        }
        Self {
            name: "pose5",
            num_points: 5,
            canonical,
            partners: vec![1, 0, 2, 4, 3],
        }
    }

    /// The canonical scheme itself; conversion is the identity.
    pub fn canonical17() -> Self {
        Self {
            name: "canonical17",
            num_points: NUM_CANONICAL,
            canonical: std::array::from_fn(CanonicalSource::Point),
            partners: Landmark::ALL.iter().map(|lm| lm.partner().index()).collect(),
        }
    }

    /// The 68-point iBUG annotation (jaw 0-16, brows 17-26, nose 27-35,
    /// eyes 36-47, mouth 48-67). Pupils are the centre of the eye contour.
    pub fn ibug68() -> Self {
        use CanonicalSource::{Mean, Point as Pt};
        const LEFT_EYE: &[usize] = &[36, 37, 38, 39, 40, 41];
        const RIGHT_EYE: &[usize] = &[42, 43, 44, 45, 46, 47];
        let canonical = [
            Mean(LEFT_EYE),
            Mean(RIGHT_EYE),
            Pt(48),
            Pt(54),
            Pt(17),
            Pt(21),
            Pt(22),
            Pt(26),
            Pt(0),
            Pt(36),
            Pt(39),
            Pt(42),
            Pt(45),
            Pt(16),
            Pt(30),
            Pt(51),
            Pt(57),
        ];
        Self {
            name: "ibug68",
            num_points: 68,
            canonical,
            partners: ibug68_partners(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Map a shape in this scheme onto the 17 canonical slots. Slots the
    /// scheme cannot supply come back unused.
    pub fn to_canonical17(&self, shape: &Shape) -> Result<Shape> {
        shape.ensure_len(self.num_points)?;
        let points = self
            .canonical
            .iter()
            .map(|source| match *source {
                CanonicalSource::Missing => Point::UNUSED,
                CanonicalSource::Point(i) => shape[i],
                CanonicalSource::Mean(ids) => {
                    if ids.iter().all(|&i| shape.is_used(i)) {
                        let sum = ids.iter().fold(Point::UNUSED, |acc, &i| acc + shape[i]);
                        sum * (1.0 / ids.len() as f64)
                    } else {
                        Point::UNUSED
                    }
                }
            })
            .collect();
        Ok(Shape::new(points))
    }

    /// Reflect a shape about the vertical centre line of an image
    /// `image_width` pixels wide, relabelling left/right landmarks.
    pub fn mirror(&self, shape: &Shape, image_width: u32) -> Result<Shape> {
        shape.ensure_len(self.num_points)?;
        let points = self
            .partners
            .iter()
            .map(|&src| {
                let p = shape[src];
                if p.is_used() {
                    Point::new(mirror_x(p.x, image_width), p.y).keep_used()
                } else {
                    Point::UNUSED
                }
            })
            .collect();
        Ok(Shape::new(points))
    }
}

fn ibug68_partners() -> Vec<usize> {
    let mut partners: Vec<usize> = (0..68).collect();
    let mut pair = |a: usize, b: usize| {
        partners[a] = b;
        partners[b] = a;
    };
    for i in 0..8 {
        pair(i, 16 - i);
    }
    for i in 0..5 {
        pair(17 + i, 26 - i);
    }
    pair(31, 35);
    pair(32, 34);
    for (a, b) in [(36, 45), (37, 44), (38, 43), (39, 42), (40, 47), (41, 46)] {
        pair(a, b);
    }
    for (a, b) in [(48, 54), (49, 53), (50, 52), (55, 59), (56, 58)] {
        pair(a, b);
    }
    for (a, b) in [(60, 64), (61, 63), (65, 67)] {
        pair(a, b);
    }
    partners
}

/// Read the five pose points straight out of a canonical 17-point shape.
pub(crate) fn pose_points(shape17: &Shape) -> [Point; 5] {
    Landmark::POSE.map(|lm| shape17[lm.index()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::XJITTER;

    #[test]
    fn test_builtin_schemes_validate() {
        for scheme in [
            LandmarkScheme::pose5(),
            LandmarkScheme::canonical17(),
            LandmarkScheme::ibug68(),
        ] {
            let rebuilt = LandmarkScheme::new(
                scheme.name,
                scheme.num_points,
                scheme.canonical,
                scheme.partners.clone(),
            );
            assert!(rebuilt.is_ok(), "{} failed validation: {rebuilt:?}", scheme.name());
        }
    }

    #[test]
    fn test_partner_table_must_be_involution() {
        let result = LandmarkScheme::new(
            "broken",
            3,
            [CanonicalSource::Missing; NUM_CANONICAL],
            vec![1, 2, 0],
        );
        assert!(matches!(result, Err(PinError::InvalidLandmarkScheme(_))));
    }

    #[test]
    fn test_source_out_of_range_rejected() {
        let mut canonical = [CanonicalSource::Missing; NUM_CANONICAL];
        canonical[0] = CanonicalSource::Point(9);
        let result = LandmarkScheme::new("short", 2, canonical, vec![1, 0]);
        assert!(matches!(result, Err(PinError::InvalidLandmarkScheme(_))));
    }

    #[test]
    fn test_pose5_to_canonical17() {
        let shape = Shape::from(vec![
            (10.0, 20.0),
            (50.0, 20.0),
            (30.0, 40.0),
            (15.0, 60.0),
            (45.0, 60.0),
        ]);
        let s17 = LandmarkScheme::pose5().to_canonical17(&shape).unwrap();
        assert_eq!(s17.len(), NUM_CANONICAL);
        assert_eq!(s17.used_count(), 5);
        assert_eq!(s17[Landmark::LEyeOuter.index()], Point::new(10.0, 20.0));
        assert_eq!(s17[Landmark::RMouthCorner.index()], Point::new(45.0, 60.0));
        assert!(!s17.is_used(Landmark::LPupil.index()));
        assert_eq!(pose_points(&s17), [shape[0], shape[1], shape[2], shape[3], shape[4]]);
    }

    #[test]
    fn test_to_canonical17_checks_point_count() {
        let result = LandmarkScheme::ibug68().to_canonical17(&Shape::unused(17));
        assert_eq!(
            result,
            Err(PinError::PointCountMismatch { expected: 68, actual: 17 })
        );
    }

    #[test]
    fn test_ibug68_pupil_is_eye_centre() {
        let mut shape = Shape::unused(68);
        for (k, i) in (36..42).enumerate() {
            shape[i] = Point::new(100.0 + k as f64 * 2.0, 50.0 + (k % 2) as f64 * 4.0);
        }
        let s17 = LandmarkScheme::ibug68().to_canonical17(&shape).unwrap();
        let pupil = s17[Landmark::LPupil.index()];
        assert!((pupil.x - 105.0).abs() < 1e-9, "pupil.x = {}", pupil.x);
        assert!((pupil.y - 52.0).abs() < 1e-9, "pupil.y = {}", pupil.y);
        assert_eq!(s17[Landmark::LEyeOuter.index()], shape[36]);
        // right eye contour not supplied
        assert!(!s17.is_used(Landmark::RPupil.index()));
    }

    #[test]
    fn test_ibug68_pupil_unused_if_contour_incomplete() {
        let mut shape = Shape::unused(68);
        for i in 36..41 {
            shape[i] = Point::new(100.0, 50.0);
        }
        let s17 = LandmarkScheme::ibug68().to_canonical17(&shape).unwrap();
        assert!(!s17.is_used(Landmark::LPupil.index()));
    }

    #[test]
    fn test_mirror_swaps_partners() {
        let scheme = LandmarkScheme::canonical17();
        let mut shape = Shape::unused(NUM_CANONICAL);
        shape[Landmark::LEyeOuter.index()] = Point::new(40.0, 30.0);
        shape[Landmark::REyeOuter.index()] = Point::new(80.0, 32.0);
        shape[Landmark::CNoseTip.index()] = Point::new(60.0, 50.0);

        let mirrored = scheme.mirror(&shape, 100).unwrap();

        assert_eq!(mirrored[Landmark::LEyeOuter.index()], Point::new(19.0, 32.0));
        assert_eq!(mirrored[Landmark::REyeOuter.index()], Point::new(59.0, 30.0));
        assert_eq!(mirrored[Landmark::CNoseTip.index()], Point::new(39.0, 50.0));
        assert_eq!(mirrored.used_count(), 3);
        assert_eq!(scheme.mirror(&mirrored, 100).unwrap(), shape);
    }

    #[test]
    fn test_mirror_keeps_point_on_last_column_used() {
        let scheme = LandmarkScheme::canonical17();
        let mut shape = Shape::unused(NUM_CANONICAL);
        shape[Landmark::LEyeOuter.index()] = Point::new(40.0, 50.0);
        shape[Landmark::REyeOuter.index()] = Point::new(99.0, 0.0);

        let mirrored = scheme.mirror(&shape, 100).unwrap();

        assert_eq!(mirrored.used_count(), 2);
        assert_eq!(mirrored[Landmark::LEyeOuter.index()], Point::new(XJITTER, XJITTER));
        assert_eq!(mirrored[Landmark::REyeOuter.index()], Point::new(59.0, 50.0));
    }
}
