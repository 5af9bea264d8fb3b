//! Where annotated frames go: the terminal, or an OpenCV window with the
//! `preview` feature.

use faceset_core::{Control, HudStatus, Preview, PreviewError};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};

static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler. Call once at startup.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
    })
}

pub fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Prints a console line each time another ten images are saved.
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    last_reported: u32,
}

impl ProgressPrinter {
    /// The line to print for `status`, if any.
    pub fn update(&mut self, status: &HudStatus) -> Option<String> {
        if status.captured == self.last_reported || status.captured % 10 != 0 {
            return None;
        }
        self.last_reported = status.captured;
        Some(format!("  ✓ {}/{} images captured", status.captured, status.target))
    }
}

/// Headless preview: progress on stdout, Ctrl+C cancels.
#[derive(Debug, Default)]
pub struct TerminalPreview {
    progress: ProgressPrinter,
}

impl Preview for TerminalPreview {
    fn show(&mut self, _frame: &RgbImage, status: &HudStatus) -> Result<Control, PreviewError> {
        if let Some(line) = self.progress.update(status) {
            println!("{line}");
        }
        if ctrlc_received() {
            return Ok(Control::Cancel);
        }
        Ok(Control::Continue)
    }
}

#[cfg(feature = "preview")]
pub use window::WindowPreview;

#[cfg(feature = "preview")]
mod window {
    use super::{ctrlc_received, ProgressPrinter};
    use faceset_core::hud::{self, QUIT_HINT};
    use faceset_core::{Control, HudStatus, Preview, PreviewError};
    use image::RgbImage;
    use opencv::core::{Mat, Point, Scalar, CV_8UC3};
    use opencv::prelude::*;
    use opencv::{highgui, imgproc};

    const WINDOW: &str = "Dataset Capture";

    fn cv_err(e: opencv::Error) -> PreviewError {
        PreviewError(e.to_string())
    }

    /// OpenCV highgui window. `q` cancels. The window is destroyed on drop.
    pub struct WindowPreview {
        mirror: bool,
        progress: ProgressPrinter,
    }

    impl WindowPreview {
        pub fn open(mirror: bool) -> Result<Self, PreviewError> {
            highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE).map_err(cv_err)?;
            tracing::debug!(window = WINDOW, "preview window opened");
            Ok(Self {
                mirror,
                progress: ProgressPrinter::default(),
            })
        }

        fn to_bgr_mat(frame: &RgbImage) -> opencv::Result<Mat> {
            let mut rgb = Mat::new_rows_cols_with_default(
                frame.height() as i32,
                frame.width() as i32,
                CV_8UC3,
                Scalar::all(0.0),
            )?;
            rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
            let mut bgr = Mat::default();
            imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
            Ok(bgr)
        }

        fn put_text(mat: &mut Mat, text: &str, y: i32, scale: f64, bgr: (f64, f64, f64)) -> opencv::Result<()> {
            imgproc::put_text(
                mat,
                text,
                Point::new(30, y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                scale,
                Scalar::new(bgr.0, bgr.1, bgr.2, 0.0),
                2,
                imgproc::LINE_8,
                false,
            )
        }

        fn render(&self, frame: &RgbImage, status: &HudStatus) -> opencv::Result<i32> {
            let mut display = frame.clone();
            if self.mirror {
                hud::mirror_horizontal(&mut display);
                // Keep the bar filling left to right.
                hud::draw_progress_bar(&mut display, status);
            }

            let mut mat = Self::to_bgr_mat(&display)?;
            let green = (0.0, 255.0, 0.0);
            let red = (0.0, 0.0, 255.0);
            Self::put_text(&mut mat, &status.progress_text(), 50, 1.0, green)?;
            let face_color = if status.face_detected() { green } else { red };
            Self::put_text(&mut mat, status.face_text(), 100, 0.8, face_color)?;
            let hint_y = mat.rows() - 30;
            Self::put_text(&mut mat, QUIT_HINT, hint_y, 0.6, (255.0, 255.0, 255.0))?;

            highgui::imshow(WINDOW, &mat)?;
            highgui::wait_key(1)
        }
    }

    impl Preview for WindowPreview {
        fn show(&mut self, frame: &RgbImage, status: &HudStatus) -> Result<Control, PreviewError> {
            if let Some(line) = self.progress.update(status) {
                println!("{line}");
            }
            let key = self.render(frame, status).map_err(cv_err)?;
            if key & 0xFF == 'q' as i32 || ctrlc_received() {
                return Ok(Control::Cancel);
            }
            Ok(Control::Continue)
        }
    }

    impl Drop for WindowPreview {
        fn drop(&mut self) {
            if let Err(e) = highgui::destroy_window(WINDOW) {
                tracing::warn!(error = %e, "failed to close preview window");
            }
            // Let highgui process the close event.
            let _ = highgui::wait_key(1);
        }
    }
}

/// The preview selected at startup.
pub enum PreviewSink {
    Terminal(TerminalPreview),
    #[cfg(feature = "preview")]
    Window(WindowPreview),
}

impl PreviewSink {
    /// Open a window when built with `preview` and not running headless.
    pub fn select(headless: bool, mirror: bool) -> Result<Self, PreviewError> {
        #[cfg(feature = "preview")]
        if !headless {
            return Ok(Self::Window(WindowPreview::open(mirror)?));
        }
        #[cfg(not(feature = "preview"))]
        {
            let _ = mirror;
            if !headless {
                tracing::info!("built without the `preview` feature; progress is shown in the terminal");
            }
        }
        Ok(Self::Terminal(TerminalPreview::default()))
    }

    pub fn is_window(&self) -> bool {
        !matches!(self, Self::Terminal(_))
    }
}

impl Preview for PreviewSink {
    fn show(&mut self, frame: &RgbImage, status: &HudStatus) -> Result<Control, PreviewError> {
        match self {
            Self::Terminal(p) => p.show(frame, status),
            #[cfg(feature = "preview")]
            Self::Window(p) => p.show(frame, status),
        }
    }
}
