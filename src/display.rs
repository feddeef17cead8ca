// src/display.rs

use crate::error::Result;
use opencv::{core::Mat, highgui};
use tracing::warn;

/// Bounded wait for the key poll. This is the loop's only scheduling tick;
/// it must never block indefinitely.
const POLL_INTERVAL_MS: i32 = 1;

/// Interactive command decoded from one key poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
    Snapshot,
    ResetStats,
}

pub fn command_for_key(key: i32) -> Command {
    if key < 0 {
        return Command::None;
    }
    match (key & 0xff) as u8 {
        b'q' | b'Q' | b'k' | b'K' => Command::Quit,
        b's' | b'S' => Command::Snapshot,
        b'r' | b'R' => Command::ResetStats,
        _ => Command::None,
    }
}

/// Presents annotated frames and polls for a command once per iteration.
pub trait ControlSurface {
    fn show(&mut self, frame: &Mat) -> Result<()>;

    fn poll(&mut self) -> Result<Command>;

    fn close(&mut self) -> Result<()>;
}

/// highgui-backed window. Falls back to a disabled surface when no display
/// is available, so file processing still runs to completion headless.
pub struct Window {
    name: String,
    enabled: bool,
}

impl Window {
    pub fn open(name: &str) -> Self {
        let enabled = match highgui::named_window(name, highgui::WINDOW_AUTOSIZE) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to open display window: {}. Running headless.", e);
                false
            }
        };
        Self {
            name: name.to_string(),
            enabled,
        }
    }
}

impl ControlSurface for Window {
    fn show(&mut self, frame: &Mat) -> Result<()> {
        if self.enabled {
            highgui::imshow(&self.name, frame)?;
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Command> {
        if !self.enabled {
            return Ok(Command::None);
        }
        let key = highgui::wait_key(POLL_INTERVAL_MS)?;
        Ok(command_for_key(key))
    }

    fn close(&mut self) -> Result<()> {
        if self.enabled {
            highgui::destroy_window(&self.name)?;
            self.enabled = false;
        }
        Ok(())
    }
}
