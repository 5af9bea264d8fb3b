use faceset_core::detector::SCRFD_MODEL_FILE;
use faceset_core::DetectorConfig;
use std::path::PathBuf;
use std::str::FromStr;

/// Capture configuration, loaded from environment variables and overridden by flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested capture size; the driver may pick the nearest supported one.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Root folder holding one sub-folder per person (default: ./dataset).
    pub dataset_dir: PathBuf,
    /// Directory containing the SCRFD model file.
    pub model_dir: PathBuf,
    pub detector: DetectorConfig,
    /// Frames dropped after the stream starts while auto exposure settles.
    pub warmup_frames: usize,
}

impl Config {
    /// Load configuration from `FACESET_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DetectorConfig::default();
        Self {
            camera_device: lookup("FACESET_CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_string()),
            frame_width: parsed(&lookup, "FACESET_FRAME_WIDTH", 640),
            frame_height: parsed(&lookup, "FACESET_FRAME_HEIGHT", 480),
            dataset_dir: lookup("FACESET_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("dataset")),
            model_dir: lookup("FACESET_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(faceset_core::default_model_dir),
            detector: DetectorConfig {
                confidence_threshold: parsed(&lookup, "FACESET_CONFIDENCE", defaults.confidence_threshold),
                nms_threshold: parsed(&lookup, "FACESET_NMS_THRESHOLD", defaults.nms_threshold),
                intra_threads: defaults.intra_threads,
            },
            warmup_frames: parsed(&lookup, "FACESET_WARMUP_FRAMES", 4),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join(SCRFD_MODEL_FILE)
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.camera_device, "/dev/video0");
        assert_eq!((c.frame_width, c.frame_height), (640, 480));
        assert_eq!(c.dataset_dir, PathBuf::from("dataset"));
        assert_eq!(c.detector, DetectorConfig::default());
        assert_eq!(c.warmup_frames, 4);
    }

    #[test]
    fn test_env_overrides() {
        let c = config(&[
            ("FACESET_CAMERA_DEVICE", "/dev/video2"),
            ("FACESET_DATASET_DIR", "/data/faces"),
            ("FACESET_MODEL_DIR", "/opt/models"),
            ("FACESET_CONFIDENCE", "0.65"),
            ("FACESET_NMS_THRESHOLD", " 0.3 "),
            ("FACESET_FRAME_WIDTH", "1280"),
        ]);
        assert_eq!(c.camera_device, "/dev/video2");
        assert_eq!(c.dataset_dir, PathBuf::from("/data/faces"));
        assert_eq!(c.scrfd_model_path(), PathBuf::from("/opt/models/det_10g.onnx"));
        assert!((c.detector.confidence_threshold - 0.65).abs() < 1e-6);
        assert!((c.detector.nms_threshold - 0.3).abs() < 1e-6);
        assert_eq!(c.frame_width, 1280);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let c = config(&[("FACESET_CONFIDENCE", "high"), ("FACESET_WARMUP_FRAMES", "-1")]);
        assert_eq!(c.detector.confidence_threshold, DetectorConfig::default().confidence_threshold);
        assert_eq!(c.warmup_frames, 4);
    }
}
