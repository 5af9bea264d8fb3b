//! Operator overlay drawn onto preview frames.
//!
//! Everything here mutates display copies only. Saved faces are cut from the
//! frame before any of these functions run on it.

use crate::types::PixelBox;
use image::{Rgb, RgbImage};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: u32 = 3;
pub const BAR_HEIGHT: u32 = 6;
const BAR_TRACK: Rgb<u8> = Rgb([40, 40, 40]);

pub const QUIT_HINT: &str = "Press 'q' to quit";

/// What the preview shows for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HudStatus {
    pub captured: u32,
    pub target: u32,
    /// Face box in frame coordinates, when one was found.
    pub face: Option<PixelBox>,
}

impl HudStatus {
    /// Whole-number completion percentage, capped at 100.
    pub fn percent(&self) -> u32 {
        if self.target == 0 {
            return 100;
        }
        (self.captured.min(self.target) as u64 * 100 / self.target as u64) as u32
    }

    pub fn progress_text(&self) -> String {
        format!("Progress: {}/{} ({}%)", self.captured, self.target, self.percent())
    }

    pub fn face_detected(&self) -> bool {
        self.face.is_some()
    }

    pub fn face_text(&self) -> &'static str {
        if self.face_detected() {
            "Face Detected"
        } else {
            "No Face"
        }
    }
}

/// Outline `face` with a rectangle `BOX_THICKNESS` pixels wide, clipped to the frame.
pub fn draw_face_box(frame: &mut RgbImage, face: &PixelBox) {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let t = BOX_THICKNESS as i64;
    let (left, top) = (face.x as i64, face.y as i64);
    let (right, bottom) = (face.right() as i64, face.bottom() as i64);

    let mut fill = |x0: i64, y0: i64, x1: i64, y1: i64| {
        for y in y0.max(0)..y1.min(h) {
            for x in x0.max(0)..x1.min(w) {
                frame.put_pixel(x as u32, y as u32, BOX_COLOR);
            }
        }
    };

    fill(left, top, right, top + t);
    fill(left, bottom - t, right, bottom);
    fill(left, top, left + t, bottom);
    fill(right - t, top, right, bottom);
}

/// Progress bar along the top edge of the frame.
pub fn draw_progress_bar(frame: &mut RgbImage, status: &HudStatus) {
    let height = BAR_HEIGHT.min(frame.height());
    let filled = frame.width() as u64 * status.percent() as u64 / 100;
    for y in 0..height {
        for x in 0..frame.width() {
            let color = if (x as u64) < filled { BOX_COLOR } else { BAR_TRACK };
            frame.put_pixel(x, y, color);
        }
    }
}

/// Draw the full overlay for `status`.
pub fn annotate(frame: &mut RgbImage, status: &HudStatus) {
    if let Some(face) = &status.face {
        draw_face_box(frame, face);
    }
    draw_progress_bar(frame, status);
}

/// Flip left-right so the preview behaves like a mirror.
pub fn mirror_horizontal(frame: &mut RgbImage) {
    image::imageops::flip_horizontal_in_place(frame);
}
