//! Padded face extraction.

use crate::types::PixelBox;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)` inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Grow `face` by `padding` on every side and clamp to a `frame_w × frame_h` frame.
///
/// Rows span `[max(0, y - p), min(H, y + h + p))`, columns likewise. Returns
/// `None` when nothing of the padded box lies inside the frame.
pub fn padded_region(face: &PixelBox, frame_w: u32, frame_h: u32, padding: u32) -> Option<CropRegion> {
    let pad = padding as i64;
    let clamp = |v: i64, max: u32| v.clamp(0, max as i64) as u32;

    let x0 = clamp(face.x as i64 - pad, frame_w);
    let y0 = clamp(face.y as i64 - pad, frame_h);
    let x1 = clamp(face.right() as i64 + pad, frame_w);
    let y1 = clamp(face.bottom() as i64 + pad, frame_h);

    (x1 > x0 && y1 > y0).then_some(CropRegion { x0, y0, x1, y1 })
}

/// Copy the padded face out of `frame` and resize it to `size × size`.
///
/// The frame is only borrowed; the returned crop owns its pixels.
pub fn extract_face(frame: &RgbImage, face: &PixelBox, padding: u32, size: u32) -> Option<RgbImage> {
    let region = padded_region(face, frame.width(), frame.height(), padding)?;
    let crop = imageops::crop_imm(frame, region.x0, region.y0, region.width(), region.height())
        .to_image();
    Some(imageops::resize(&crop, size, size, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const W: u32 = 640;
    const H: u32 = 480;

    #[test]
    fn test_interior_box_gets_full_padding() {
        let r = padded_region(&PixelBox::new(100, 120, 80, 90), W, H, 20).unwrap();
        assert_eq!(r, CropRegion { x0: 80, y0: 100, x1: 200, y1: 230 });
    }

    #[test]
    fn test_top_left_corner_clamps() {
        let r = padded_region(&PixelBox::new(5, 10, 50, 50), W, H, 20).unwrap();
        assert_eq!(r, CropRegion { x0: 0, y0: 0, x1: 75, y1: 80 });
    }

    #[test]
    fn test_top_right_corner_clamps() {
        let r = padded_region(&PixelBox::new(600, 3, 35, 40), W, H, 20).unwrap();
        assert_eq!(r, CropRegion { x0: 580, y0: 0, x1: W, y1: 63 });
    }

    #[test]
    fn test_bottom_left_corner_clamps() {
        let r = padded_region(&PixelBox::new(0, 440, 60, 35), W, H, 20).unwrap();
        assert_eq!(r, CropRegion { x0: 0, y0: 420, x1: 80, y1: H });
    }

    #[test]
    fn test_bottom_right_corner_clamps() {
        let r = padded_region(&PixelBox::new(610, 450, 30, 30), W, H, 20).unwrap();
        assert_eq!(r, CropRegion { x0: 590, y0: 430, x1: W, y1: H });
    }

    #[test]
    fn test_box_partly_outside_frame() {
        let r = padded_region(&PixelBox::new(-30, -30, 60, 60), W, H, 20).unwrap();
        assert_eq!(r, CropRegion { x0: 0, y0: 0, x1: 50, y1: 50 });
    }

    #[test]
    fn test_box_entirely_outside_frame() {
        assert!(padded_region(&PixelBox::new(700, 10, 40, 40), W, H, 20).is_none());
        assert!(padded_region(&PixelBox::new(-100, -100, 30, 30), W, H, 20).is_none());
    }

    #[test]
    fn test_extract_face_is_always_square_size() {
        let frame = RgbImage::from_pixel(W, H, Rgb([10, 20, 30]));
        for face in [
            PixelBox::new(300, 200, 12, 12),
            PixelBox::new(100, 50, 300, 400),
            PixelBox::new(0, 0, 640, 480),
            PixelBox::new(620, 470, 20, 10),
        ] {
            let img = extract_face(&frame, &face, 20, 128).unwrap();
            assert_eq!(img.dimensions(), (128, 128), "face {face:?}");
        }
    }

    #[test]
    fn test_extract_face_takes_pixels_from_region() {
        // Left half red, right half blue; a box on the right yields blue only.
        let frame = RgbImage::from_fn(200, 100, |x, _| {
            if x < 100 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let img = extract_face(&frame, &PixelBox::new(140, 30, 30, 30), 20, 64).unwrap();
        assert!(img.pixels().all(|p| p[0] < 10 && p[2] > 245));
    }
}
