//! faceset-core: face dataset capture engine.
//!
//! SCRFD face detection via ONNX Runtime, padded face sampling, per-person
//! dataset folders and the capture loop that ties them together.

pub mod capture;
pub mod crop;
pub mod dataset;
pub mod detector;
pub mod hud;
pub mod sampling;
pub mod types;

pub use capture::{
    run_capture, warm_up, CaptureReport, Control, EndReason, FaceFinder, FrameSource,
    Outcome, Preview, PreviewError,
};
pub use dataset::{prepare_session, DatasetError, Preparation, SessionDir};
pub use detector::{default_model_dir, DetectorConfig, DetectorError, FaceDetector};
pub use hud::HudStatus;
pub use sampling::{CapturePolicy, CaptureState};
pub use types::{BoundingBox, PixelBox};
