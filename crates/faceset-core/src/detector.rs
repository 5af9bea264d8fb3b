//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes a single-channel frame into the square network input, decodes
//! the three anchor-free stride heads and suppresses overlapping boxes.

use crate::capture::FaceFinder;
use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

/// File name of the detection model inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} (download det_10g.onnx from insightface)")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Tunable detector parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Minimum anchor score for a candidate box.
    pub confidence_threshold: f32,
    /// IoU above which the lower-scoring of two boxes is dropped.
    pub nms_threshold: f32,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            nms_threshold: 0.4,
            intra_threads: 2,
        }
    }
}

/// Directory searched for model files when none is configured.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("faceset")
        .join("models")
}

/// Mapping between letterboxed network space and frame space.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: (target as f32 - new_w) / 2.0,
            pad_y: (target as f32 - new_h) / 2.0,
        }
    }

    fn to_frame(self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Output tensor indices for one stride: (score_idx, bbox_idx).
type StrideOutputs = (usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    config: DetectorConfig,
    /// Per-stride output indices for strides [8, 16, 32].
    stride_outputs: [StrideOutputs; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: impl AsRef<Path>, config: DetectorConfig) -> Result<Self, DetectorError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(config.intra_threads)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            confidence = config.confidence_threshold,
            nms = config.nms_threshold,
            "loaded SCRFD model"
        );

        if output_names.len() < 6 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires score and bbox outputs for 3 strides, got {} outputs",
                output_names.len()
            )));
        }

        let stride_outputs = discover_output_indices(&output_names);
        tracing::debug!(?stride_outputs, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            config,
            stride_outputs,
        })
    }

    /// Detect faces in a grayscale frame, returning boxes sorted by confidence.
    pub fn detect(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError> {
        if gray.width() == 0 || gray.height() == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = preprocess(gray);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_outputs[pos];

            let (_, scores) = outputs[score_idx].try_extract_tensor::<f32>().map_err(|e| {
                DetectorError::InferenceFailed(format!("scores stride {stride}: {e}"))
            })?;
            let (_, bboxes) = outputs[bbox_idx].try_extract_tensor::<f32>().map_err(|e| {
                DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}"))
            })?;

            candidates.extend(decode_stride(
                scores,
                bboxes,
                stride,
                SCRFD_INPUT_SIZE as usize,
                letterbox,
                self.config.confidence_threshold,
            ));
        }

        let faces = nms(candidates, self.config.nms_threshold);
        tracing::trace!(count = faces.len(), "faces detected");
        Ok(faces)
    }
}

impl FaceFinder for FaceDetector {
    fn find_faces(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError> {
        self.detect(gray)
    }
}

/// Build the NCHW input tensor: bilinear resize into the letterbox, pad with
/// the mean so padding normalizes to zero, and replicate the single channel.
fn preprocess(gray: &GrayImage) -> (Array4<f32>, Letterbox) {
    let letterbox = Letterbox::fit(gray.width(), gray.height(), SCRFD_INPUT_SIZE);
    let new_w = ((gray.width() as f32 * letterbox.scale).round() as u32).clamp(1, SCRFD_INPUT_SIZE);
    let new_h = ((gray.height() as f32 * letterbox.scale).round() as u32).clamp(1, SCRFD_INPUT_SIZE);
    let resized = imageops::resize(gray, new_w, new_h, FilterType::Triangle);

    let size = SCRFD_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    let off_x = letterbox.pad_x.floor() as usize;
    let off_y = letterbox.pad_y.floor() as usize;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let value = (pixel[0] as f32 - SCRFD_MEAN) / SCRFD_STD;
        let (tx, ty) = (off_x + x as usize, off_y + y as usize);
        for channel in 0..3 {
            tensor[[0, channel, ty, tx]] = value;
        }
    }

    (tensor, letterbox)
}

/// Map outputs to stride slots by name ("score_8", "bbox_16", ...), falling
/// back to the standard positional layout [scores 8/16/32, bboxes 8/16/32, ...].
fn discover_output_indices(names: &[String]) -> [StrideOutputs; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named: Option<Vec<StrideOutputs>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| Some((find("score", stride)?, find("bbox", stride)?)))
        .collect();

    match named {
        Some(found) => {
            tracing::debug!("SCRFD: using name-based output tensor mapping");
            [found[0], found[1], found[2]]
        }
        None => {
            tracing::debug!(?names, "SCRFD: output names not recognized, using positional mapping");
            [(0, 3), (1, 4), (2, 5)]
        }
    }
}

/// Decode the candidate boxes of a single stride level into frame space.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    input_size: usize,
    letterbox: Letterbox,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = input_size / stride;
    let anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
    let step = stride as f32;

    (0..anchors)
        .filter_map(|idx| {
            let score = *scores.get(idx)?;
            if score <= threshold {
                return None;
            }
            let offsets = bboxes.get(idx * 4..idx * 4 + 4)?;

            let cell = idx / SCRFD_ANCHORS_PER_CELL;
            let cx = (cell % grid) as f32 * step;
            let cy = (cell / grid) as f32 * step;

            let (x1, y1) = letterbox.to_frame(cx - offsets[0] * step, cy - offsets[1] * step);
            let (x2, y2) = letterbox.to_frame(cx + offsets[2] * step, cy + offsets[3] * step);

            Some(BoundingBox {
                x: x1,
                y: y1,
                width: x2 - x1,
                height: y2 - y1,
                confidence: score,
            })
        })
        .collect()
}

/// Non-maximum suppression. Output is sorted by confidence, highest first.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoundingBox> = Vec::with_capacity(detections.len());
    for det in detections {
        if keep.iter().all(|kept| kept.iou(&det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bbox(x: f32, y: f32, w: f32, h: f32, conf: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence: conf }
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            make_bbox(5.0, 5.0, 100.0, 100.0, 0.8),
            make_bbox(0.0, 0.0, 100.0, 100.0, 0.9),
            make_bbox(200.0, 200.0, 50.0, 50.0, 0.7),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_sorts_by_confidence() {
        let detections = vec![
            make_bbox(0.0, 0.0, 10.0, 10.0, 0.6),
            make_bbox(50.0, 50.0, 10.0, 10.0, 0.95),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_landscape_pads_vertically() {
        let lb = Letterbox::fit(640, 480, 640);
        assert!((lb.scale - 1.0).abs() < 1e-6);
        assert!(lb.pad_x.abs() < 1e-6);
        assert!((lb.pad_y - 80.0).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        let lb = Letterbox::fit(320, 240, 640);
        let (orig_x, orig_y) = (100.0f32, 50.0f32);
        let boxed_x = orig_x * lb.scale + lb.pad_x;
        let boxed_y = orig_y * lb.scale + lb.pad_y;

        let (x, y) = lb.to_frame(boxed_x, boxed_y);
        assert!((x - orig_x).abs() < 0.1, "x: {x} vs {orig_x}");
        assert!((y - orig_y).abs() < 0.1, "y: {y} vs {orig_y}");
    }

    #[test]
    fn test_preprocess_pads_with_zero() {
        let gray = GrayImage::from_pixel(64, 32, image::Luma([255]));
        let (tensor, lb) = preprocess(&gray);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        // Padding rows above the content normalize to zero.
        assert_eq!(tensor[[0, 0, 0, 320]], 0.0);
        // Content is replicated across channels.
        let row = lb.pad_y as usize + 10;
        let expected = (255.0 - SCRFD_MEAN) / SCRFD_STD;
        for c in 0..3 {
            assert!((tensor[[0, c, row, 320]] - expected).abs() < 0.02);
        }
    }

    #[test]
    fn test_decode_stride_maps_to_frame() {
        // Stride 32 on a 64x64 input: 2x2 grid, 2 anchors per cell.
        let mut scores = vec![0.0f32; 8];
        let mut bboxes = vec![0.0f32; 32];
        // Anchor 3 sits in cell 1 -> (cx, cy) = (32, 0).
        scores[3] = 0.9;
        bboxes[12..16].copy_from_slice(&[0.5, 0.0, 0.5, 1.0]);
        let lb = Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };

        let dets = decode_stride(&scores, &bboxes, 32, 64, lb, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.x - 16.0).abs() < 1e-6);
        assert!(d.y.abs() < 1e-6);
        assert!((d.width - 32.0).abs() < 1e-6);
        assert!((d.height - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stride_threshold() {
        let scores = vec![0.5f32; 8];
        let bboxes = vec![1.0f32; 32];
        let lb = Letterbox { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };
        assert!(decode_stride(&scores, &bboxes, 32, 64, lb, 0.5).is_empty());
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ].iter().map(|s| s.to_string()).collect();

        let indices = discover_output_indices(&names);
        assert_eq!(indices, [(2, 0), (5, 3), (8, 6)]);
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names: Vec<String> = (0..9).map(|i: usize| i.to_string()).collect();
        assert_eq!(discover_output_indices(&names), [(0, 3), (1, 4), (2, 5)]);
    }

    #[test]
    fn test_load_missing_model() {
        let err = FaceDetector::load("/nonexistent/det_10g.onnx", DetectorConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, DetectorError::ModelNotFound(_)));
    }
}
