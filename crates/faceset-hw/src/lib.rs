//! faceset-hw: webcam access for dataset capture.
//!
//! Opens V4L2 capture devices, streams frames over mmap buffers and converts
//! YUYV, MJPEG, RGB3 and GREY buffers to RGB images.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameStream, PixelFormat};
pub use frame::{Frame, FrameError};
