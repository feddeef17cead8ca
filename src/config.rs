// src/config.rs

use crate::error::{PipelineError, Result};
use crate::types::{Config, DetectorParams};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the bundle once, before any frame is processed. Parameters
    /// are never re-checked at use sites.
    pub fn validate(&self) -> Result<()> {
        validate_params("car", &self.detection.car)?;
        validate_params("pedestrian", &self.detection.pedestrian)?;

        let overlay = &self.overlay;
        if overlay.shadow_offset < 0 {
            return Err(invalid("overlay.shadow_offset must not be negative"));
        }
        if overlay.box_thickness < 1 || overlay.text_thickness < 1 {
            return Err(invalid("overlay line thicknesses must be at least 1"));
        }
        if overlay.font_scale <= 0.0 {
            return Err(invalid("overlay.font_scale must be positive"));
        }
        if !(0.0..=1.0).contains(&overlay.panel_alpha) {
            return Err(invalid("overlay.panel_alpha must be within [0.0, 1.0]"));
        }

        if self.output.codec.chars().count() != 4 {
            return Err(invalid("output.codec must be a four character code"));
        }
        if self.output.default_fps <= 0.0 {
            return Err(invalid("output.default_fps must be positive"));
        }

        Ok(())
    }
}

fn validate_params(class: &str, params: &DetectorParams) -> Result<()> {
    if params.scale_factor <= 1.0 {
        return Err(invalid(&format!(
            "detection.{}.scale_factor must be greater than 1.0, got {}",
            class, params.scale_factor
        )));
    }
    if params.min_neighbors < 0 {
        return Err(invalid(&format!(
            "detection.{}.min_neighbors must not be negative",
            class
        )));
    }
    if params.min_size[0] <= 0 || params.min_size[1] <= 0 {
        return Err(invalid(&format!(
            "detection.{}.min_size dimensions must be positive",
            class
        )));
    }
    Ok(())
}

fn invalid(msg: &str) -> PipelineError {
    PipelineError::Config(msg.to_string())
}
