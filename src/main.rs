// src/main.rs

mod config;
mod detector;
mod display;
mod error;
mod overlay;
mod pipeline;
mod sink;
mod source;
mod stats;
mod types;

use anyhow::{bail, Result};
use clap::Parser;
use detector::{CascadeDetector, DetectionStage};
use pipeline::PipelineSession;
use sink::VideoFileSink;
use source::{SourceSpec, VideoSource};
use std::path::PathBuf;
use tracing::info;
use types::{Config, ObjectClass};

const WINDOW_NAME: &str = "Car and Pedestrian Detector";

#[derive(Parser, Debug)]
#[command(name = "traffic-detection")]
#[command(about = "Car and pedestrian detection over video streams")]
struct Args {
    /// Path to the input video file
    #[arg(long, short = 'v', value_name = "PATH", conflicts_with = "camera")]
    video: Option<PathBuf>,

    /// Use a live camera by index instead of a file
    #[arg(long, short = 'c', value_name = "INDEX")]
    camera: Option<i32>,

    /// Path to save the annotated output video
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Path to the YAML configuration bundle
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the car cascade file
    #[arg(long, value_name = "PATH")]
    car_cascade: Option<PathBuf>,

    /// Override the pedestrian cascade file
    #[arg(long, value_name = "PATH")]
    pedestrian_cascade: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    let level = if args.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(format!("traffic_detection={}", level))
        .init();

    info!("🚗 Car and Pedestrian Detection System Starting");
    info!("✓ Configuration loaded");

    let spec = match (&args.video, args.camera) {
        (Some(path), None) => SourceSpec::File(path.clone()),
        (None, Some(index)) => SourceSpec::Camera(index),
        (None, None) => bail!("Provide --video or --camera"),
        (Some(_), Some(_)) => unreachable!("clap rejects conflicting sources"),
    };

    // Detectors load before the source opens; a bad model aborts before any
    // frame is read
    let car_cascade = args
        .car_cascade
        .unwrap_or_else(|| config.detection.car_cascade_path());
    let pedestrian_cascade = args
        .pedestrian_cascade
        .unwrap_or_else(|| config.detection.pedestrian_cascade_path());

    let stage = DetectionStage::new(
        Box::new(CascadeDetector::new(
            &car_cascade,
            ObjectClass::Car,
            config.detection.car,
        )?),
        Box::new(CascadeDetector::new(
            &pedestrian_cascade,
            ObjectClass::Pedestrian,
            config.detection.pedestrian,
        )?),
    );
    info!("✓ Detection stage ready");

    let source = VideoSource::open(spec.clone(), config.output.default_fps)?;
    let output_dir = PathBuf::from(&config.output.output_dir);
    let sink = VideoFileSink::new(
        args.output,
        output_dir.clone(),
        &config.output.codec,
        source.fps(),
    )?;
    let surface = display::Window::open(WINDOW_NAME);

    info!("Press Q or K to quit, S to save a snapshot, R to reset counters");

    let session = PipelineSession::new(
        Box::new(source),
        stage,
        Box::new(surface),
        Box::new(sink),
        config.overlay.clone(),
        spec.to_string(),
        Some(output_dir),
    );

    let report = session.run()?;
    info!(
        "Session finished ({:?}) in {:.1}s",
        report.stop_reason, report.elapsed_secs
    );

    Ok(())
}
