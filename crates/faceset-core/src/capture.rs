//! The capture loop and the seams it runs against.
//!
//! Camera, detector and preview are traits so the loop can be driven by
//! scripted frames in tests.

use crate::dataset::SessionDir;
use crate::detector::DetectorError;
use crate::hud::{self, HudStatus};
use crate::sampling::{sample_face, CapturePolicy, CaptureState};
use crate::types::{BoundingBox, PixelBox};
use image::{GrayImage, RgbImage};
use thiserror::Error;

/// Source of colour frames, typically a webcam stream.
pub trait FrameSource {
    type Error: std::fmt::Display;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<RgbImage, Self::Error>;
}

/// Face detection over a single-channel frame.
pub trait FaceFinder {
    /// Candidate faces, most confident first.
    fn find_faces(&mut self, gray: &GrayImage) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Operator decision returned by the preview after each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Cancel,
}

#[derive(Error, Debug)]
#[error("preview failed: {0}")]
pub struct PreviewError(pub String);

/// Display surface for annotated frames.
pub trait Preview {
    /// Present `frame` (already annotated) and poll for cancellation.
    fn show(&mut self, frame: &RgbImage, status: &HudStatus) -> Result<Control, PreviewError>;
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    TargetReached,
    Cancelled,
    ReadFailed(String),
    /// Detection, saving or the preview failed mid-session.
    Failed(String),
}

/// Whether a finished session produced enough images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Incomplete,
}

/// Counters and exit reason of one capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub captured: u32,
    pub target: u32,
    pub frames_read: u64,
    pub detected_frames: u32,
    pub end: EndReason,
}

impl CaptureReport {
    pub fn outcome(&self, min_success: u32) -> Outcome {
        if self.captured >= min_success {
            Outcome::Success
        } else {
            Outcome::Incomplete
        }
    }
}

/// Read and drop up to `count` frames while exposure settles.
///
/// Stops at the first read error and returns how many frames were dropped.
/// A dead camera is then reported by the first read of [`run_capture`].
pub fn warm_up<S: FrameSource>(source: &mut S, count: usize) -> usize {
    for dropped in 0..count {
        if let Err(e) = source.read_frame() {
            tracing::warn!(error = %e, dropped, "warmup read failed");
            return dropped;
        }
    }
    tracing::debug!(count, "discarded warmup frames");
    count
}

/// Run one capture session until the target is met, the operator cancels, or
/// something fails.
///
/// Per frame: read, convert to grayscale, detect, sample the first face from
/// the untouched frame, then annotate and show. Files are numbered from
/// `state.captured`, so indices stay contiguous from `000`. Every exit path
/// yields a report, so images already on disk are always accounted for.
pub fn run_capture<S, F, P>(
    source: &mut S,
    finder: &mut F,
    preview: &mut P,
    session: &SessionDir,
    policy: &CapturePolicy,
) -> CaptureReport
where
    S: FrameSource,
    F: FaceFinder,
    P: Preview,
{
    let mut state = CaptureState::new();
    let mut frames_read = 0u64;

    let end = loop {
        if state.is_complete(policy) {
            break EndReason::TargetReached;
        }

        let mut frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, frames_read, "frame read failed");
                break EndReason::ReadFailed(e.to_string());
            }
        };
        frames_read += 1;

        let gray = image::imageops::grayscale(&frame);
        // Only the first (most confident) face is used.
        let face = match finder.find_faces(&gray) {
            Ok(faces) => faces.first().map(PixelBox::from_bounding_box),
            Err(e) => {
                tracing::error!(error = %e, frames_read, "face detection failed");
                break EndReason::Failed(format!("detector error: {e}"));
            }
        };

        if let Some(face) = &face {
            if let Some(crop) = sample_face(&frame, face, &mut state, policy) {
                match session.save_face(&crop, state.captured) {
                    Ok(path) => {
                        state.record_saved();
                        tracing::debug!(path = %path.display(), captured = state.captured, "saved face");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, captured = state.captured, "failed to save face");
                        break EndReason::Failed(format!("dataset error: {e}"));
                    }
                }
                if state.captured % 10 == 0 {
                    tracing::info!(captured = state.captured, target = policy.target_images, "capture progress");
                }
            }
        }

        let status = HudStatus {
            captured: state.captured,
            target: policy.target_images,
            face,
        };
        hud::annotate(&mut frame, &status);

        match preview.show(&frame, &status) {
            Ok(Control::Continue) => {}
            Ok(Control::Cancel) => {
                tracing::info!(captured = state.captured, "capture cancelled by operator");
                break EndReason::Cancelled;
            }
            Err(e) => {
                tracing::error!(error = %e, "preview failed");
                break EndReason::Failed(e.to_string());
            }
        }
    };

    CaptureReport {
        captured: state.captured,
        target: policy.target_images,
        frames_read,
        detected_frames: state.detected_frames,
        end,
    }
}
