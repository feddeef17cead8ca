// src/pipeline.rs

use crate::detector::DetectionStage;
use crate::display::{Command, ControlSurface};
use crate::error::Result;
use crate::overlay;
use crate::sink::OutputSink;
use crate::source::FrameSource;
use crate::stats::RunStatistics;
use crate::types::OverlayConfig;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping,
    Stopped,
}

/// Why the loop ended. Neither variant is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    UserQuit,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub timestamp: String,
    pub source_id: String,
    pub stop_reason: StopReason,
    pub frames: u64,
    pub cars: u64,
    pub pedestrians: u64,
    pub snapshots: u64,
    pub elapsed_secs: f64,
    pub avg_fps: f64,
}

/// One end-to-end run over a single source. Owns every handle it uses; none
/// of them outlive the session. Consumed by `run`, so a finished session
/// cannot be restarted.
pub struct PipelineSession {
    source: Box<dyn FrameSource>,
    stage: DetectionStage,
    surface: Box<dyn ControlSurface>,
    sink: Box<dyn OutputSink>,
    stats: RunStatistics,
    style: OverlayConfig,
    source_id: String,
    log_dir: Option<PathBuf>,
    state: LoopState,
    frames_processed: u64,
    snapshots: u64,
    started: Instant,
}

impl PipelineSession {
    pub fn new(
        source: Box<dyn FrameSource>,
        stage: DetectionStage,
        surface: Box<dyn ControlSurface>,
        sink: Box<dyn OutputSink>,
        style: OverlayConfig,
        source_id: String,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            source,
            stage,
            surface,
            sink,
            stats: RunStatistics::default(),
            style,
            source_id,
            log_dir,
            state: LoopState::Running,
            frames_processed: 0,
            snapshots: 0,
            started: Instant::now(),
        }
    }

    /// Drive the loop to completion. Teardown runs on every exit path
    /// before an error is propagated, so no handle leaks on failure.
    pub fn run(mut self) -> Result<SessionReport> {
        info!("Session started for {}", self.source_id);

        let outcome = self.run_loop();
        self.teardown();
        let stop_reason = outcome?;

        let elapsed = self.started.elapsed().as_secs_f64();
        let report = SessionReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            source_id: self.source_id.clone(),
            stop_reason,
            frames: self.stats.frames,
            cars: self.stats.cars,
            pedestrians: self.stats.pedestrians,
            snapshots: self.snapshots,
            elapsed_secs: elapsed,
            avg_fps: if elapsed > 0.0 {
                self.frames_processed as f64 / elapsed
            } else {
                0.0
            },
        };

        if let Some(dir) = &self.log_dir {
            if let Err(e) = append_session_log(dir, &report) {
                warn!("Failed to write session log: {}", e);
            }
        }

        info!("Processing completed. Total frames: {}", report.frames);
        info!("Total car detections: {}", report.cars);
        info!("Total pedestrian detections: {}", report.pedestrians);
        info!("Processing speed: {:.1} FPS", report.avg_fps);

        Ok(report)
    }

    fn run_loop(&mut self) -> Result<StopReason> {
        while self.state == LoopState::Running {
            let Some(frame) = self.source.next_frame()? else {
                self.state = LoopState::Stopping;
                return Ok(StopReason::EndOfStream);
            };
            self.frames_processed += 1;

            let detections = self.stage.run(&frame)?;
            self.stats.record(&detections.cars, &detections.pedestrians);

            let annotated = overlay::render(&frame, &detections, &self.stats, &self.style)?;
            self.sink.write(&annotated)?;
            self.surface.show(&annotated)?;

            match self.surface.poll()? {
                Command::Quit => {
                    info!("Quit requested by user");
                    self.state = LoopState::Stopping;
                    return Ok(StopReason::UserQuit);
                }
                Command::Snapshot => {
                    self.sink.snapshot(&annotated, self.stats.frames)?;
                    self.snapshots += 1;
                }
                Command::ResetStats => {
                    self.stats.reset();
                    info!("Statistics reset");
                }
                Command::None => {}
            }
        }
        unreachable!("loop exits only via return")
    }

    /// Release order: source, sink, surface. Failures here are logged, not
    /// propagated; they must not mask a loop error.
    fn teardown(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopping;

        if let Err(e) = self.source.close() {
            warn!("Failed to release video source: {}", e);
        }
        if let Err(e) = self.sink.finish() {
            warn!("Failed to flush output sink: {}", e);
        }
        if let Err(e) = self.surface.close() {
            warn!("Failed to release display surface: {}", e);
        }

        self.state = LoopState::Stopped;
    }
}

fn append_session_log(dir: &Path, report: &SessionReport) -> io::Result<()> {
    let path = dir.join("session_log.jsonl");
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(report)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    writeln!(file, "{}", line)?;
    Ok(())
}
