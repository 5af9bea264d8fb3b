//! Which detections become dataset images.

use crate::crop::extract_face;
use crate::types::PixelBox;
use image::RgbImage;

/// Fixed capture parameters for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePolicy {
    /// Images required before the session stops on its own.
    pub target_images: u32,
    /// Save on every n-th frame with a detected face.
    pub capture_every: u32,
    /// Margin in pixels added around the detector box.
    pub padding: u32,
    /// Edge length of the saved square image.
    pub face_size: u32,
    /// Fewest images for the session to count as usable.
    pub min_success: u32,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            target_images: 100,
            capture_every: 3,
            padding: 20,
            face_size: 128,
            min_success: 80,
        }
    }
}

/// Counters owned by one run of the capture loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureState {
    /// Frames in which a face was found. Never reset within a session.
    pub detected_frames: u32,
    /// Images written so far; also the index of the next file.
    pub captured: u32,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame with a face and report whether it falls on the sampling cadence.
    pub fn on_detection(&mut self, policy: &CapturePolicy) -> bool {
        self.detected_frames += 1;
        self.detected_frames % policy.capture_every.max(1) == 0
    }

    pub fn record_saved(&mut self) {
        self.captured += 1;
    }

    pub fn is_complete(&self, policy: &CapturePolicy) -> bool {
        self.captured >= policy.target_images
    }
}

/// Register one detected face and return the crop to save, if this detection is sampled.
///
/// Takes the frame by shared reference: the crop is cut from the frame as
/// captured, before any overlay is drawn onto it.
pub fn sample_face(
    frame: &RgbImage,
    face: &PixelBox,
    state: &mut CaptureState,
    policy: &CapturePolicy,
) -> Option<RgbImage> {
    if !state.on_detection(policy) {
        return None;
    }
    let crop = extract_face(frame, face, policy.padding, policy.face_size);
    if crop.is_none() {
        tracing::debug!(?face, detected = state.detected_frames, "sampled face lies outside frame");
    }
    crop
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame() -> RgbImage {
        RgbImage::from_pixel(320, 240, Rgb([120, 110, 100]))
    }

    #[test]
    fn test_every_third_detection_is_sampled() {
        let policy = CapturePolicy::default();
        let mut state = CaptureState::new();
        let face = PixelBox::new(100, 80, 60, 60);

        let mut sampled = Vec::new();
        for _ in 0..12 {
            if sample_face(&frame(), &face, &mut state, &policy).is_some() {
                sampled.push(state.detected_frames);
            }
        }

        assert_eq!(sampled, vec![3, 6, 9, 12]);
        assert_eq!(state.detected_frames, 12);
    }

    #[test]
    fn test_saving_does_not_reset_detection_counter() {
        let policy = CapturePolicy::default();
        let mut state = CaptureState::new();
        let face = PixelBox::new(100, 80, 60, 60);

        for _ in 0..3 {
            if sample_face(&frame(), &face, &mut state, &policy).is_some() {
                state.record_saved();
            }
        }
        assert_eq!(state, CaptureState { detected_frames: 3, captured: 1 });

        assert!(sample_face(&frame(), &face, &mut state, &policy).is_none());
        assert_eq!(state.detected_frames, 4);
    }

    #[test]
    fn test_sampled_crop_has_face_size() {
        let policy = CapturePolicy::default();
        let mut state = CaptureState { detected_frames: 2, captured: 0 };
        let crop = sample_face(&frame(), &PixelBox::new(10, 10, 200, 150), &mut state, &policy)
            .unwrap();
        assert_eq!(crop.dimensions(), (128, 128));
    }

    #[test]
    fn test_face_outside_frame_is_counted_but_not_cropped() {
        let policy = CapturePolicy::default();
        let mut state = CaptureState { detected_frames: 2, captured: 0 };
        let crop = sample_face(&frame(), &PixelBox::new(900, 900, 40, 40), &mut state, &policy);
        assert!(crop.is_none());
        assert_eq!(state.detected_frames, 3);
    }

    #[test]
    fn test_is_complete_at_target() {
        let policy = CapturePolicy::default();
        let mut state = CaptureState { detected_frames: 0, captured: 99 };
        assert!(!state.is_complete(&policy));
        state.record_saved();
        assert!(state.is_complete(&policy));
    }
}
