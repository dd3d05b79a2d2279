//! Face region of interest: an upright crop around the face, and conversion
//! of shapes between the image frame and the ROI frame.

use crate::alignment::{warp_affine, Transform2D};
use crate::detpar::DetectorParameter;
use crate::error::{PinError, Result};
use crate::types::Shape;
use image::GrayImage;

/// Default half-extent of the ROI around the face centre, in face sizes.
pub const DEFAULT_BORDER_FRAC: f64 = 1.0;

/// Crops a face ROI and maps shapes into it.
pub trait RoiExtractor {
    /// Cut the ROI for `detpar` out of `image`, returning it with the detector
    /// parameters expressed in ROI coordinates. `flip` mirrors the ROI.
    fn face_roi(
        &self,
        image: &GrayImage,
        detpar: &DetectorParameter,
        flip: bool,
    ) -> Result<(GrayImage, DetectorParameter)>;

    /// Map an image-frame shape into the (unflipped) ROI frame.
    fn to_roi_frame(
        &self,
        shape: &Shape,
        detpar_roi: &DetectorParameter,
        detpar: &DetectorParameter,
    ) -> Result<Shape>;

    /// Map an ROI-frame shape back into the image frame.
    fn from_roi_frame(
        &self,
        shape: &Shape,
        detpar_roi: &DetectorParameter,
        detpar: &DetectorParameter,
    ) -> Result<Shape>;
}

/// Axis-aligned crop around the face, de-rotated so the face is upright.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UprightRoi {
    pub border_frac: f64,
}

impl Default for UprightRoi {
    fn default() -> Self {
        Self {
            border_frac: DEFAULT_BORDER_FRAC,
        }
    }
}

/// Image-frame to ROI-frame transform: shift by the ROI origin, then undo the
/// face rotation about the ROI face centre.
fn roi_transform(detpar_roi: &DetectorParameter, detpar: &DetectorParameter) -> Result<Transform2D> {
    let shift = Transform2D::translation(detpar_roi.x - detpar.x, detpar_roi.y - detpar.y);
    if detpar.rot == 0.0 {
        return Ok(shift);
    }
    Ok(Transform2D::rotation(detpar_roi.center(), -detpar.rot)?.then(&shift))
}

/// Start and length of a `2 * half` window around `center`, clamped to
/// `[0, limit)` and at least one pixel long.
fn clamped_span(center: f64, half: f64, limit: u32) -> (u32, u32) {
    let limit = i64::from(limit);
    let lo = ((center - half).round() as i64).clamp(0, limit - 1);
    let hi = ((center + half).round() as i64).clamp(lo + 1, limit);
    (lo as u32, (hi - lo) as u32)
}

impl RoiExtractor for UprightRoi {
    fn face_roi(
        &self,
        image: &GrayImage,
        detpar: &DetectorParameter,
        flip: bool,
    ) -> Result<(GrayImage, DetectorParameter)> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PinError::EmptyImage { width, height });
        }

        let half = self.border_frac * detpar.width.max(detpar.height);
        let (x0, roi_w) = clamped_span(detpar.x, half, width);
        let (y0, roi_h) = clamped_span(detpar.y, half, height);
        tracing::debug!(x0, y0, roi_w, roi_h, rot = detpar.rot, "face ROI");

        let mut detpar_roi = DetectorParameter {
            x: detpar.x - f64::from(x0),
            y: detpar.y - f64::from(y0),
            ..*detpar
        };
        let to_roi = roi_transform(&detpar_roi, detpar)?;
        detpar_roi.left_eye = detpar.left_eye.map(|p| to_roi.apply(p));
        detpar_roi.right_eye = detpar.right_eye.map(|p| to_roi.apply(p));
        detpar_roi.mouth = detpar.mouth.map(|p| to_roi.apply(p));

        let mut roi = if detpar.rot == 0.0 {
            image::imageops::crop_imm(image, x0, y0, roi_w, roi_h).to_image()
        } else {
            warp_affine(image, &to_roi, roi_w, roi_h)
        };

        if flip {
            image::imageops::flip_horizontal_in_place(&mut roi);
            detpar_roi = detpar_roi.flip_position(roi_w);
        }

        Ok((roi, detpar_roi))
    }

    fn to_roi_frame(
        &self,
        shape: &Shape,
        detpar_roi: &DetectorParameter,
        detpar: &DetectorParameter,
    ) -> Result<Shape> {
        Ok(roi_transform(detpar_roi, detpar)?.apply_used(shape))
    }

    fn from_roi_frame(
        &self,
        shape: &Shape,
        detpar_roi: &DetectorParameter,
        detpar: &DetectorParameter,
    ) -> Result<Shape> {
        let inverse = roi_transform(detpar_roi, detpar)?
            .inverse()
            .ok_or(PinError::DegenerateAlignment)?;
        Ok(inverse.apply_used(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, XJITTER};
    use crate::yaw::YawBucket;
    use image::Luma;

    fn detpar(x: f64, y: f64, size: f64, rot: f64) -> DetectorParameter {
        DetectorParameter {
            x,
            y,
            width: size,
            height: size,
            rot,
            yaw: 0.0,
            bucket: YawBucket::FRONTAL,
            left_eye: Some(Point::new(x - 10.0, y - 10.0)),
            right_eye: Some(Point::new(x + 10.0, y - 10.0)),
            mouth: Some(Point::new(x, y + 15.0)),
        }
    }

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x + 2 * y) % 256) as u8]))
    }

    #[test]
    fn test_clamped_span() {
        assert_eq!(clamped_span(50.0, 10.0, 100), (40, 20));
        assert_eq!(clamped_span(5.0, 10.0, 100), (0, 15));
        assert_eq!(clamped_span(95.0, 10.0, 100), (85, 15));
        // centre far outside the image still yields one pixel
        assert_eq!(clamped_span(500.0, 10.0, 100), (99, 1));
    }

    #[test]
    fn test_upright_roi_is_plain_crop() {
        let img = gradient(200, 150);
        let d = detpar(100.0, 70.0, 30.0, 0.0);
        let (roi, d_roi) = UprightRoi::default().face_roi(&img, &d, false).unwrap();

        assert_eq!(roi.dimensions(), (60, 60));
        assert_eq!((d_roi.x, d_roi.y), (30.0, 30.0));
        assert_eq!(roi.get_pixel(0, 0), img.get_pixel(70, 40));
        assert_eq!(d_roi.left_eye, Some(Point::new(20.0, 20.0)));
        assert_eq!(d_roi.width, d.width);
    }

    #[test]
    fn test_roi_clamped_to_image() {
        let img = gradient(100, 100);
        let d = detpar(20.0, 90.0, 40.0, 0.0);
        let (roi, d_roi) = UprightRoi::default().face_roi(&img, &d, false).unwrap();
        assert_eq!(roi.dimensions(), (60, 50));
        assert_eq!((d_roi.x, d_roi.y), (20.0, 40.0));
    }

    #[test]
    fn test_rotated_roi_derotates_eyes() {
        let img = gradient(200, 200);
        let mut d = detpar(100.0, 100.0, 30.0, 20.0);
        let rot = Transform2D::rotation(Point::new(100.0, 100.0), 20.0).unwrap();
        d.left_eye = Some(rot.apply(Point::new(90.0, 90.0)));
        d.right_eye = Some(rot.apply(Point::new(110.0, 90.0)));

        let (_, d_roi) = UprightRoi::default().face_roi(&img, &d, false).unwrap();
        let (l, r) = (d_roi.left_eye.unwrap(), d_roi.right_eye.unwrap());
        assert!((l.y - r.y).abs() < 1e-9, "eyes not level: {l:?} {r:?}");
        assert!((r.x - l.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_flip_mirrors_roi() {
        let img = gradient(200, 150);
        let d = detpar(100.0, 70.0, 30.0, 0.0);
        let (plain, d_plain) = UprightRoi::default().face_roi(&img, &d, false).unwrap();
        let (flipped, d_flip) = UprightRoi::default().face_roi(&img, &d, true).unwrap();
        assert_eq!(flipped.get_pixel(0, 5), plain.get_pixel(59, 5));
        assert_eq!(d_flip.x, 59.0 - d_plain.x);
    }

    #[test]
    fn test_empty_image_rejected() {
        let img = GrayImage::new(0, 10);
        let result = UprightRoi::default().face_roi(&img, &detpar(1.0, 1.0, 5.0, 0.0), false);
        assert_eq!(result.err(), Some(PinError::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn test_frame_conversion_inverts() {
        let roi = UprightRoi::default();
        let img = gradient(300, 300);
        let d = detpar(150.0, 140.0, 60.0, -15.0);
        let (_, d_roi) = roi.face_roi(&img, &d, false).unwrap();

        let shape = Shape::from(vec![(120.0, 130.0), (0.0, 0.0), (170.0, 180.0)]);
        let in_roi = roi.to_roi_frame(&shape, &d_roi, &d).unwrap();
        assert!(!in_roi.is_used(1), "unused point must stay unused");

        let back = roi.from_roi_frame(&in_roi, &d_roi, &d).unwrap();
        for i in [0, 2] {
            assert!(back[i].distance(&shape[i]) < 1e-9, "{:?} vs {:?}", back[i], shape[i]);
        }
    }

    #[test]
    fn test_point_at_roi_corner_stays_used() {
        let roi = UprightRoi::default();
        let img = gradient(300, 300);
        let d = detpar(100.0, 100.0, 30.0, 0.0);
        let (_, d_roi) = roi.face_roi(&img, &d, false).unwrap();

        let shape = Shape::from(vec![(70.0, 70.0), (110.0, 90.0)]);
        let in_roi = roi.to_roi_frame(&shape, &d_roi, &d).unwrap();
        assert_eq!(in_roi.used_count(), 2);
        assert_eq!(in_roi[0], Point::new(XJITTER, XJITTER));
        assert_eq!(in_roi[1], Point::new(40.0, 20.0));
    }

    #[test]
    fn test_invalid_rotation_propagates() {
        let img = gradient(50, 50);
        let d = detpar(25.0, 25.0, 10.0, 400.0);
        assert_eq!(
            UprightRoi::default().face_roi(&img, &d, false).err(),
            Some(PinError::InvalidRotationRange(-400.0))
        );
    }
}
