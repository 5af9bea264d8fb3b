use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use faceset_core::{
    dataset, run_capture, warm_up, CapturePolicy, FaceDetector, FrameSource, Preparation,
};
use faceset_hw::{Camera, CameraError, FrameStream};
use image::RgbImage;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod preview;
mod prompt;
mod summary;

use config::Config;
use preview::PreviewSink;

#[derive(Parser)]
#[command(name = "faceset", about = "Capture a labelled face dataset from a webcam")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture face images for one person
    Capture(CaptureArgs),
    /// List V4L2 capture devices
    Devices,
}

#[derive(Args)]
struct CaptureArgs {
    /// Person name (prompted for when omitted)
    #[arg(short, long)]
    name: Option<String>,
    /// Clear an existing folder for this person without asking
    #[arg(long)]
    overwrite: bool,
    /// V4L2 device path [env: FACESET_CAMERA_DEVICE]
    #[arg(short, long)]
    device: Option<String>,
    /// Requested frame width [env: FACESET_FRAME_WIDTH]
    #[arg(long)]
    width: Option<u32>,
    /// Requested frame height [env: FACESET_FRAME_HEIGHT]
    #[arg(long)]
    height: Option<u32>,
    /// Dataset root folder [env: FACESET_DATASET_DIR]
    #[arg(long)]
    dataset_dir: Option<PathBuf>,
    /// Directory containing det_10g.onnx [env: FACESET_MODEL_DIR]
    #[arg(long)]
    model_dir: Option<PathBuf>,
    /// Detector confidence threshold [env: FACESET_CONFIDENCE]
    #[arg(long)]
    confidence: Option<f32>,
    /// Detector NMS IoU threshold [env: FACESET_NMS_THRESHOLD]
    #[arg(long)]
    nms: Option<f32>,
    /// Seconds to wait before capturing starts
    #[arg(long, default_value_t = 3)]
    countdown: u64,
    /// Mirror the preview window
    #[arg(long)]
    mirror: bool,
    /// Never open a preview window
    #[arg(long)]
    headless: bool,
}

impl CaptureArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.camera_device = device.clone();
        }
        if let Some(width) = self.width {
            config.frame_width = width;
        }
        if let Some(height) = self.height {
            config.frame_height = height;
        }
        if let Some(dir) = &self.dataset_dir {
            config.dataset_dir = dir.clone();
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(confidence) = self.confidence {
            config.detector.confidence_threshold = confidence;
        }
        if let Some(nms) = self.nms {
            config.detector.nms_threshold = nms;
        }
    }
}

/// Webcam stream as a capture loop frame source.
struct CameraSource<'a> {
    stream: FrameStream<'a>,
}

impl FrameSource for CameraSource<'_> {
    type Error = CameraError;

    fn read_frame(&mut self) -> Result<RgbImage, CameraError> {
        let frame = self.stream.next_frame()?;
        tracing::trace!(sequence = frame.sequence, "frame");
        Ok(frame.image)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture(args) => capture(args),
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
            Ok(())
        }
    }
}

fn capture(args: CaptureArgs) -> Result<()> {
    let mut config = Config::from_env();
    args.apply(&mut config);
    let policy = CapturePolicy::default();

    println!("\n{}", summary::rule());
    println!("DATASET CAPTURE");
    println!("{}", summary::rule());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let raw_name = match &args.name {
        Some(name) => name.clone(),
        None => prompt::prompt_name(&mut input, &mut out)?,
    };
    let name = match dataset::validate_name(&raw_name) {
        Ok(name) => name,
        Err(e) => {
            println!("Invalid name: {e}");
            return Err(e.into());
        }
    };

    // Load the model before touching the dataset folder.
    let model_path = config.scrfd_model_path();
    let mut detector = FaceDetector::load(&model_path, config.detector)
        .with_context(|| format!("failed to load face detector from {}", model_path.display()))?;

    let session = match dataset::prepare_session(&config.dataset_dir, &name, || {
        if args.overwrite {
            Ok(true)
        } else {
            prompt::confirm_overwrite(&mut input, &mut out, &name)
        }
    })? {
        Preparation::Ready(session) => session,
        Preparation::Declined => {
            println!("Cancelled");
            return Ok(());
        }
    };
    tracing::info!(person = %name, path = %session.path().display(), "session ready");

    if let Err(e) = preview::setup_ctrlc_handler() {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
    }

    // Camera, stream and preview live in this block so they are all released
    // before the summary is printed.
    let report = {
        let camera = match Camera::open(&config.camera_device, config.frame_width, config.frame_height) {
            Ok(camera) => camera,
            Err(e) => {
                println!("Cannot access webcam ({})", config.camera_device);
                return Err(e).context("failed to open camera");
            }
        };
        tracing::info!(device = %config.camera_device, format = ?camera.pixel_format(), "camera opened");
        let stream = camera.stream().context("failed to start camera stream")?;
        let mut source = CameraSource { stream };
        // A failed warmup read is left for the loop to report as a read failure.
        warm_up(&mut source, config.warmup_frames);

        let mut preview = PreviewSink::select(args.headless, args.mirror)?;
        print_instructions(&policy, args.countdown, preview.is_window());
        std::thread::sleep(Duration::from_secs(args.countdown));
        println!("\nCapturing...");

        run_capture(&mut source, &mut detector, &mut preview, &session, &policy)
    };

    tracing::info!(
        captured = report.captured,
        frames = report.frames_read,
        detected = report.detected_frames,
        end = ?report.end,
        "capture finished"
    );

    if let Some(notice) = summary::end_notice(&report.end) {
        println!("\n{notice}");
    }
    print!("{}", summary::render_summary(&report, &policy, &session, &config.dataset_dir));
    io::stdout().flush()?;

    Ok(())
}

fn print_instructions(policy: &CapturePolicy, countdown: u64, window: bool) {
    println!("\n{}", summary::rule());
    println!("INSTRUCTIONS:");
    println!("{}", summary::rule());
    println!("System will capture {} images", policy.target_images);
    println!("Move your head slowly:");
    println!("   - Look straight");
    println!("   - Turn slightly left/right");
    println!("   - Move slightly up/down");
    if window {
        println!("Press 'q' in the preview window to stop early");
    } else {
        println!("Press Ctrl+C to stop early");
    }
    println!();
    println!("Starting in {countdown} seconds...");
    println!("{}", summary::rule());
}
