//! Frame type and colour conversion from raw V4L2 buffers.

use image::{ImageFormat, Rgb, RgbImage};

/// A captured colour camera frame.
#[derive(Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Driver sequence number; gaps mean dropped frames.
    pub sequence: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("MJPEG decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), FrameError> {
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// BT.601 limited-range YCbCr to RGB, fixed point.
fn ycbcr_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let c = 298 * (y as i32 - 16);
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    Rgb([
        clamp(c + 409 * e),
        clamp(c - 100 * d - 208 * e),
        clamp(c + 516 * d),
    ])
}

/// Convert packed YUYV (4:2:2) to RGB.
///
/// Each 4-byte group [Y0, U, Y1, V] holds two pixels sharing one chroma pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 2) as usize;
    check_len(yuyv, expected)?;

    let mut rgb = Vec::with_capacity(expected / 2 * 3);
    for group in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (group[0], group[1], group[2], group[3]);
        rgb.extend_from_slice(&ycbcr_to_rgb(y0, u, v).0);
        rgb.extend_from_slice(&ycbcr_to_rgb(y1, u, v).0);
    }
    RgbImage::from_raw(width, height, rgb).ok_or(FrameError::InvalidLength {
        expected,
        actual: yuyv.len(),
    })
}

/// Replicate 8-bit grayscale into all three channels.
pub fn grey_to_rgb(gray: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height) as usize;
    check_len(gray, expected)?;
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let v = gray[(y * width + x) as usize];
        Rgb([v, v, v])
    }))
}

/// Wrap packed 24-bit RGB.
pub fn rgb24_to_image(rgb: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 3) as usize;
    check_len(rgb, expected)?;
    RgbImage::from_raw(width, height, rgb[..expected].to_vec()).ok_or(FrameError::InvalidLength {
        expected,
        actual: rgb.len(),
    })
}

/// Decode one Motion-JPEG frame.
pub fn decode_mjpeg(jpeg: &[u8]) -> Result<RgbImage, FrameError> {
    Ok(image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)?.to_rgb8())
}
