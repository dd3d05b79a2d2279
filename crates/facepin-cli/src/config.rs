use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Half-extent of the face ROI in face sizes.
    pub roi_border_frac: f64,
    /// Directory the ROI image is written to when `--roi-out` is not given.
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from `FACEPIN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            roi_border_frac: env_f64("FACEPIN_ROI_BORDER_FRAC", facepin_core::roi::DEFAULT_BORDER_FRAC),
            output_dir: std::env::var("FACEPIN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Where the ROI image goes by default.
    pub fn default_roi_path(&self) -> PathBuf {
        self.output_dir.join("face_roi.png")
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_f64_falls_back_on_garbage() {
        assert_eq!(env_f64("FACEPIN_TEST_UNSET_VARIABLE", 1.5), 1.5);
    }

    #[test]
    fn test_default_roi_path() {
        let config = Config {
            roi_border_frac: 1.0,
            output_dir: PathBuf::from("/tmp/out"),
        };
        assert_eq!(config.default_roi_path(), PathBuf::from("/tmp/out/face_roi.png"));
    }
}
