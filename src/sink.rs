// src/sink.rs

use crate::error::{PipelineError, Result};
use opencv::{
    core::{self, Mat, Size},
    imgcodecs,
    prelude::*,
    videoio::VideoWriter,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Destination for annotated output. `write` appends to the recording (a
/// no-op when none is configured); `snapshot` persists a single still and is
/// always available.
pub trait OutputSink {
    fn write(&mut self, frame: &Mat) -> Result<()>;

    fn snapshot(&mut self, frame: &Mat, frame_index: u64) -> Result<PathBuf>;

    fn finish(&mut self) -> Result<()>;
}

/// Writes an MP4 recording plus on-demand JPEG snapshots. The video writer
/// is created lazily from the first frame so the container dimensions always
/// match the stream; a later mismatch is fatal.
pub struct VideoFileSink {
    video_path: Option<PathBuf>,
    snapshot_dir: PathBuf,
    codec: String,
    fps: f64,
    writer: Option<VideoWriter>,
    frame_size: Option<(i32, i32)>,
    snapshot_seq: u64,
    finished: bool,
}

impl VideoFileSink {
    pub fn new(
        video_path: Option<PathBuf>,
        snapshot_dir: PathBuf,
        codec: &str,
        fps: f64,
    ) -> Result<Self> {
        fs::create_dir_all(&snapshot_dir)?;
        if let Some(path) = &video_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            info!("Recording annotated video to {}", path.display());
        }

        Ok(Self {
            video_path,
            snapshot_dir,
            codec: codec.to_string(),
            fps,
            writer: None,
            frame_size: None,
            snapshot_seq: 0,
            finished: false,
        })
    }

    fn open_writer(&self, path: &Path, size: (i32, i32)) -> Result<VideoWriter> {
        let chars: Vec<char> = self.codec.chars().collect();
        let fourcc = VideoWriter::fourcc(chars[0], chars[1], chars[2], chars[3])?;

        let path_str = path
            .to_str()
            .ok_or_else(|| PipelineError::Encoding(format!("invalid path: {}", path.display())))?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            self.fps,
            Size::new(size.0, size.1),
            true,
        )?;
        if !writer.is_opened()? {
            return Err(PipelineError::Encoding(format!(
                "could not open writer for {} ({})",
                path.display(),
                self.codec
            )));
        }
        info!(
            "✓ Video writer ready: {}x{} @ {:.1} FPS",
            size.0, size.1, self.fps
        );
        Ok(writer)
    }
}

impl OutputSink for VideoFileSink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        let Some(path) = self.video_path.clone() else {
            return Ok(());
        };

        let size = (frame.cols(), frame.rows());
        match self.frame_size {
            None => {
                self.writer = Some(self.open_writer(&path, size)?);
                self.frame_size = Some(size);
            }
            Some(expected) if expected != size => {
                return Err(PipelineError::Encoding(format!(
                    "frame size changed from {}x{} to {}x{}",
                    expected.0, expected.1, size.0, size.1
                )));
            }
            Some(_) => {}
        }

        self.writer
            .as_mut()
            .expect("writer exists once frame_size is set")
            .write(frame)
            .map_err(|e| PipelineError::Encoding(e.to_string()))
    }

    fn snapshot(&mut self, frame: &Mat, frame_index: u64) -> Result<PathBuf> {
        // The sequence suffix keeps names unique even when the frame counter
        // restarts after a statistics reset
        self.snapshot_seq += 1;
        let path = self.snapshot_dir.join(format!(
            "snapshot_f{:06}_{:03}.jpg",
            frame_index, self.snapshot_seq
        ));

        let path_str = path
            .to_str()
            .ok_or_else(|| PipelineError::Encoding(format!("invalid path: {}", path.display())))?;
        let written = imgcodecs::imwrite(path_str, frame, &core::Vector::new())
            .map_err(|e| PipelineError::Encoding(e.to_string()))?;
        if !written {
            return Err(PipelineError::Encoding(format!(
                "could not write snapshot {}",
                path.display()
            )));
        }

        info!("📸 Snapshot saved: {}", path.display());
        Ok(path)
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.release() {
                warn!("Failed to release video writer: {}", e);
            }
        }
        Ok(())
    }
}
