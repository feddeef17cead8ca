// src/types.rs

use opencv::core::Rect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub overlay: OverlayConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub cascade_dir: String,
    pub car_cascade: String,
    pub pedestrian_cascade: String,
    pub car: DetectorParams,
    pub pedestrian: DetectorParams,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cascade_dir: "cascades".to_string(),
            car_cascade: "cars.xml".to_string(),
            pedestrian_cascade: "haarcascade_fullbody.xml".to_string(),
            car: DetectorParams {
                scale_factor: 1.1,
                min_neighbors: 3,
                min_size: [30, 30],
            },
            pedestrian: DetectorParams {
                scale_factor: 1.1,
                min_neighbors: 5,
                min_size: [40, 80],
            },
        }
    }
}

impl DetectionConfig {
    pub fn car_cascade_path(&self) -> PathBuf {
        Path::new(&self.cascade_dir).join(&self.car_cascade)
    }

    pub fn pedestrian_cascade_path(&self) -> PathBuf {
        Path::new(&self.cascade_dir).join(&self.pedestrian_cascade)
    }
}

/// Multi-scale search parameters for one object class.
///
/// `scale_factor` must stay above 1.0; each pass shrinks the scan window by
/// this factor, so 1.0 would never converge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: [i32; 2],
}

/// Colors are BGR triples, matching the capture format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub car_color: [u8; 3],
    pub pedestrian_color: [u8; 3],
    pub shadow_color: [u8; 3],
    pub shadow_offset: i32,
    pub box_thickness: i32,
    pub font_scale: f64,
    pub text_thickness: i32,
    pub panel_alpha: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            car_color: [255, 0, 0],
            pedestrian_color: [0, 255, 255],
            shadow_color: [0, 0, 255],
            shadow_offset: 2,
            box_thickness: 2,
            font_scale: 0.6,
            text_thickness: 2,
            panel_alpha: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: String,
    pub default_fps: f64,
    pub codec: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            default_fps: 30.0,
            codec: "mp4v".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Car,
    Pedestrian,
}

impl ObjectClass {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectClass::Car => "Car",
            ObjectClass::Pedestrian => "Pedestrian",
        }
    }
}

/// Per-frame detection results. Boxes carry no identity; two boxes in
/// consecutive frames are never the same object.
#[derive(Debug, Clone, Default)]
pub struct FrameDetections {
    pub cars: Vec<Rect>,
    pub pedestrians: Vec<Rect>,
}
