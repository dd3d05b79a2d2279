//! 2D similarity transforms: least-squares point-set alignment, rotation
//! about an origin, and affine image warping.

use crate::error::{PinError, Result};
use crate::types::{Point, Shape};
use image::{GrayImage, Luma};

/// Largest magnitude accepted by [`Transform2D::rotation`], in degrees.
const MAX_ROTATION_DEG: f64 = 360.0;

/// A 2×3 affine transform, row-major:
/// ```text
/// | m0  m1  m2 |
/// | m3  m4  m5 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub m: [f64; 6],
}

impl Transform2D {
    pub const IDENTITY: Transform2D = Transform2D {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self {
            m: [1.0, 0.0, dx, 0.0, 1.0, dy],
        }
    }

    /// Least-squares similarity transform (scale, rotation, translation)
    /// mapping `src` onto `dst`.
    ///
    /// Solves the overdetermined system
    /// ```text
    ///   sx * a - sy * b + tx = dx
    ///   sy * a + sx * b + ty = dy
    /// ```
    /// through its 4×4 normal equations.
    pub fn similarity(src: &[Point], dst: &[Point]) -> Result<Self> {
        if src.len() != dst.len() {
            return Err(PinError::PointCountMismatch {
                expected: src.len(),
                actual: dst.len(),
            });
        }
        if src.len() < 2 {
            return Err(PinError::InsufficientConstraints { used: src.len() });
        }

        let mut ata = [[0.0f64; 4]; 4];
        let mut atb = [0.0f64; 4];

        for (s, d) in src.iter().zip(dst) {
            let r1 = [s.x, -s.y, 1.0, 0.0];
            let r2 = [s.y, s.x, 0.0, 1.0];
            for j in 0..4 {
                for k in 0..4 {
                    ata[j][k] += r1[j] * r1[k] + r2[j] * r2[k];
                }
                atb[j] += r1[j] * d.x + r2[j] * d.y;
            }
        }

        let [a, b, tx, ty] = solve_4x4(ata, atb).ok_or(PinError::DegenerateAlignment)?;
        Ok(Self {
            m: [a, -b, tx, b, a, ty],
        })
    }

    /// Rotation by `angle_deg` about `center`, positive anticlockwise as the
    /// image is displayed (y down), unit scale.
    pub fn rotation(center: Point, angle_deg: f64) -> Result<Self> {
        if !(-MAX_ROTATION_DEG..=MAX_ROTATION_DEG).contains(&angle_deg) {
            return Err(PinError::InvalidRotationRange(angle_deg));
        }
        Ok(Self::rotation_unchecked(center, angle_deg))
    }

    pub(crate) fn rotation_unchecked(center: Point, angle_deg: f64) -> Self {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        Self {
            m: [
                cos,
                sin,
                (1.0 - cos) * center.x - sin * center.y,
                -sin,
                cos,
                sin * center.x + (1.0 - cos) * center.y,
            ],
        }
    }

    /// `self` applied after `first`.
    pub fn then(&self, first: &Transform2D) -> Transform2D {
        let [a0, a1, a2, a3, a4, a5] = self.m;
        let [b0, b1, b2, b3, b4, b5] = first.m;
        Transform2D {
            m: [
                a0 * b0 + a1 * b3,
                a0 * b1 + a1 * b4,
                a0 * b2 + a1 * b5 + a2,
                a3 * b0 + a4 * b3,
                a3 * b1 + a4 * b4,
                a3 * b2 + a4 * b5 + a5,
            ],
        }
    }

    /// Inverse transform, or `None` if the linear part is singular.
    pub fn inverse(&self) -> Option<Transform2D> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * e - b * d;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv = 1.0 / det;
        let (ia, ib, id, ie) = (e * inv, -b * inv, -d * inv, a * inv);
        Some(Transform2D {
            m: [ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)],
        })
    }

    pub fn apply(&self, p: Point) -> Point {
        let [a, b, c, d, e, f] = self.m;
        Point::new(a * p.x + b * p.y + c, d * p.x + e * p.y + f)
    }

    /// Transform every point, including ones at the unused sentinel.
    pub fn apply_all(&self, shape: &Shape) -> Shape {
        Shape::new(shape.points.iter().map(|&p| self.apply(p)).collect())
    }

    /// Transform the used points only. Unused points stay unused and used
    /// points stay used, even when mapped onto the origin.
    pub fn apply_used(&self, shape: &Shape) -> Shape {
        Shape::new(
            shape
                .points
                .iter()
                .map(|&p| {
                    if p.is_used() {
                        self.apply(p).keep_used()
                    } else {
                        Point::UNUSED
                    }
                })
                .collect(),
        )
    }
}

/// Solve a 4×4 linear system via Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(ata: [[f64; 4]; 4], atb: [f64; 4]) -> Option<[f64; 4]> {
    // Augmented matrix [A | b] as 4x5
    let mut m = [[0.0f64; 5]; 4];
    for i in 0..4 {
        m[i][..4].copy_from_slice(&ata[i]);
        m[i][4] = atb[i];
    }

    for col in 0..4 {
        let mut max_row = col;
        let mut max_val = m[col][col].abs();
        for row in (col + 1)..4 {
            if m[row][col].abs() > max_val {
                max_val = m[row][col].abs();
                max_row = row;
            }
        }
        m.swap(col, max_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f64; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }

    Some(x)
}

/// Warp `src` into a `width`×`height` output where `transform` maps source
/// coordinates to output coordinates.
///
/// Uses bilinear interpolation. Out-of-bounds pixels are filled with 0 (black).
pub fn warp_affine(src: &GrayImage, transform: &Transform2D, width: u32, height: u32) -> GrayImage {
    let Some(inv) = transform.inverse() else {
        return GrayImage::new(width, height);
    };
    let (src_w, src_h) = (src.width() as i64, src.height() as i64);

    let sample = |x: i64, y: i64| -> f64 {
        if x >= 0 && x < src_w && y >= 0 && y < src_h {
            f64::from(src.get_pixel(x as u32, y as u32)[0])
        } else {
            0.0
        }
    };

    GrayImage::from_fn(width, height, |ox, oy| {
        let s = inv.apply(Point::new(f64::from(ox), f64::from(oy)));

        let x0 = s.x.floor() as i64;
        let y0 = s.y.floor() as i64;
        let fx = s.x - x0 as f64;
        let fy = s.y - y0 as f64;

        let val = sample(x0, y0) * (1.0 - fx) * (1.0 - fy)
            + sample(x0 + 1, y0) * fx * (1.0 - fy)
            + sample(x0, y0 + 1) * (1.0 - fx) * fy
            + sample(x0 + 1, y0 + 1) * fx * fy;

        Luma([val.round().clamp(0.0, 255.0) as u8])
    })
}
