// src/source.rs

use crate::error::{PipelineError, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Source identifier: a video file on disk or a live camera index.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    File(PathBuf),
    Camera(i32),
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::File(path) => write!(f, "{}", path.display()),
            SourceSpec::Camera(index) => write!(f, "camera:{}", index),
        }
    }
}

/// Supplier of frames for one session. `next_frame` yields `None` at
/// end-of-stream; that is a normal outcome, not an error.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Mat>>;

    fn fps(&self) -> f64;

    fn close(&mut self) -> Result<()>;
}

pub struct VideoSource {
    cap: VideoCapture,
    spec: SourceSpec,
    fps: f64,
    frames_read: u64,
    released: bool,
}

impl VideoSource {
    /// Open the source. Failure here is fatal and reported before any frame
    /// is processed. `fallback_fps` covers sources that report no rate
    /// (live cameras commonly report 0).
    pub fn open(spec: SourceSpec, fallback_fps: f64) -> Result<Self> {
        let source_open = || PipelineError::SourceOpen {
            source_id: spec.to_string(),
        };

        let cap = match &spec {
            SourceSpec::File(path) => {
                if !path.is_file() {
                    return Err(source_open());
                }
                let path_str = path.to_str().ok_or_else(source_open)?;
                VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(|_| source_open())?
            }
            SourceSpec::Camera(index) => {
                VideoCapture::new(*index, videoio::CAP_ANY).map_err(|_| source_open())?
            }
        };

        if !cap.is_opened().map_err(|_| source_open())? {
            return Err(source_open());
        }

        let reported_fps = cap.get(videoio::CAP_PROP_FPS)?;
        let fps = if reported_fps > 0.0 {
            reported_fps
        } else {
            fallback_fps
        };
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!("Opened source {}: {}x{} @ {:.1} FPS", spec, width, height, fps);

        Ok(Self {
            cap,
            spec,
            fps,
            frames_read: 0,
            released: false,
        })
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame)? || frame.empty() {
            info!("End of stream for {} after {} frame(s)", self.spec, self.frames_read);
            return Ok(None);
        }
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn close(&mut self) -> Result<()> {
        if !self.released {
            self.cap.release()?;
            self.released = true;
        }
        Ok(())
    }
}
