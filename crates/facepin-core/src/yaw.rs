//! Discrete yaw buckets and pose-specific model selection.
//!
//! Models are trained only for frontal and right-facing poses. A bank of `M`
//! models yields `2M - 1` signed buckets: bucket `0` is frontal, `+k` uses
//! model `k` directly and `-k` uses model `k` on a mirrored image.

use crate::error::{PinError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket boundaries in degrees, indexed by bank size. A yaw strictly beyond
/// `boundaries[k]` on either side lands in bucket `±(k + 1)`.
const BOUNDARIES_1: &[f64] = &[];
const BOUNDARIES_3: &[f64] = &[14.0, 35.0];

/// Nominal yaw of each bucket magnitude for a three-model bank, for labels.
const NOMINAL_3: [u32; 3] = [0, 22, 45];

/// A signed, discretized yaw range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YawBucket(pub i32);

impl YawBucket {
    pub const FRONTAL: YawBucket = YawBucket(0);

    pub fn is_left_facing(self) -> bool {
        self.0 < 0
    }

    /// Index of the right-facing model serving this bucket.
    pub fn model_index(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    /// The bucket of the horizontally mirrored face.
    pub fn mirrored(self) -> YawBucket {
        YawBucket(-self.0)
    }
}

impl fmt::Display for YawBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.model_index();
        let sign = if self.is_left_facing() { "_" } else { "" };
        match NOMINAL_3.get(magnitude) {
            Some(deg) => write!(f, "yaw{sign}{deg:02}"),
            None => write!(f, "yaw{sign}#{magnitude}"),
        }
    }
}

/// Calibrated mapping from continuous yaw to buckets for a bank of a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawBuckets {
    boundaries: &'static [f64],
}

impl YawBuckets {
    pub fn for_model_count(nmodels: usize) -> Result<Self> {
        let boundaries = match nmodels {
            1 => BOUNDARIES_1,
            3 => BOUNDARIES_3,
            n => return Err(PinError::UnsupportedModelCount(n)),
        };
        Ok(Self { boundaries })
    }

    /// Bucket for `yaw` degrees. Symmetric about zero: `bucket(-y) == -bucket(y)`.
    pub fn bucket(&self, yaw: f64) -> YawBucket {
        let level = self.boundaries.iter().filter(|&&b| yaw.abs() > b).count() as i32;
        if yaw < 0.0 {
            YawBucket(-level)
        } else {
            YawBucket(level)
        }
    }
}

/// Which model to use and whether the working frame must be mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub bucket: YawBucket,
    pub model_index: usize,
    pub mirror: bool,
}

impl ModelSelection {
    pub fn from_bucket(bucket: YawBucket) -> Self {
        Self {
            bucket,
            model_index: bucket.model_index(),
            mirror: bucket.is_left_facing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_model_counts() {
        assert!(YawBuckets::for_model_count(1).is_ok());
        assert!(YawBuckets::for_model_count(3).is_ok());
        for n in [0, 2, 4] {
            assert_eq!(
                YawBuckets::for_model_count(n),
                Err(PinError::UnsupportedModelCount(n))
            );
        }
    }

    #[test]
    fn test_single_model_is_always_frontal() {
        let buckets = YawBuckets::for_model_count(1).unwrap();
        for yaw in [-80.0, -20.0, 0.0, 33.0, 90.0] {
            assert_eq!(buckets.bucket(yaw), YawBucket::FRONTAL);
        }
    }

    #[test]
    fn test_three_model_boundaries() {
        let buckets = YawBuckets::for_model_count(3).unwrap();
        let cases = [
            (0.0, 0),
            (14.0, 0),
            (14.01, 1),
            (35.0, 1),
            (35.01, 2),
            (60.0, 2),
            (-14.0, 0),
            (-14.01, -1),
            (-35.0, -1),
            (-35.01, -2),
        ];
        for (yaw, want) in cases {
            assert_eq!(buckets.bucket(yaw), YawBucket(want), "yaw {yaw}");
        }
    }

    #[test]
    fn test_bucketing_is_monotonic_and_symmetric() {
        let buckets = YawBuckets::for_model_count(3).unwrap();
        let mut prev = buckets.bucket(-90.0);
        let mut yaw = -90.0;
        while yaw <= 90.0 {
            let b = buckets.bucket(yaw);
            assert!(b >= prev, "bucket decreased at yaw {yaw}");
            assert_eq!(buckets.bucket(-yaw), b.mirrored(), "asymmetric at yaw {yaw}");
            prev = b;
            yaw += 0.25;
        }
    }

    #[test]
    fn test_selection_from_bucket() {
        let sel = ModelSelection::from_bucket(YawBucket(-2));
        assert_eq!(sel.model_index, 2);
        assert!(sel.mirror);
        let sel = ModelSelection::from_bucket(YawBucket(1));
        assert_eq!(sel.model_index, 1);
        assert!(!sel.mirror);
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(YawBucket(0).to_string(), "yaw00");
        assert_eq!(YawBucket(1).to_string(), "yaw22");
        assert_eq!(YawBucket(-2).to_string(), "yaw_45");
    }
}
