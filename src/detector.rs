// src/detector.rs

use crate::error::{PipelineError, Result};
use crate::types::{DetectorParams, FrameDetections, ObjectClass};
use opencv::{
    core::{self, Mat, Rect, Size},
    imgproc, objdetect,
    prelude::*,
};
use std::path::Path;
use tracing::{debug, info};

/// Detector backend for a single object class.
///
/// Implementations search one frame and return bounding boxes wholly
/// contained within it. A frame with no matches yields an empty vector;
/// per-frame calls do not report detection failure.
pub trait Detector {
    fn class(&self) -> ObjectClass;

    fn detect(&mut self, frame: &Mat) -> Result<Vec<Rect>>;
}

/// Pretrained multi-scale cascade classifier for one object class.
pub struct CascadeDetector {
    class: ObjectClass,
    classifier: objdetect::CascadeClassifier,
    params: DetectorParams,
}

impl CascadeDetector {
    /// Load the classifier definition once, up front. A missing or corrupt
    /// file is fatal here; it is never surfaced per frame.
    pub fn new(cascade_path: &Path, class: ObjectClass, params: DetectorParams) -> Result<Self> {
        let model_load = || PipelineError::ModelLoad {
            path: cascade_path.display().to_string(),
        };

        if !cascade_path.is_file() {
            return Err(model_load());
        }

        let path_str = cascade_path.to_str().ok_or_else(model_load)?;
        let classifier = objdetect::CascadeClassifier::new(path_str).map_err(|_| model_load())?;
        if classifier.empty().map_err(|_| model_load())? {
            return Err(model_load());
        }

        info!(
            "✓ Loaded {} cascade: {}",
            class.label(),
            cascade_path.display()
        );

        Ok(Self {
            class,
            classifier,
            params,
        })
    }
}

impl Detector for CascadeDetector {
    fn class(&self) -> ObjectClass {
        self.class
    }

    fn detect(&mut self, frame: &Mat) -> Result<Vec<Rect>> {
        // The search runs on luminance only
        let mut gray = Mat::default();
        imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let mut raw = core::Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &gray,
            &mut raw,
            self.params.scale_factor,
            self.params.min_neighbors,
            0,
            Size::new(self.params.min_size[0], self.params.min_size[1]),
            Size::default(),
        )?;

        let bounds = Rect::new(0, 0, frame.cols(), frame.rows());
        Ok(raw
            .iter()
            .filter_map(|r| clamp_box(r, bounds, self.params.min_size))
            .collect())
    }
}

/// Clip a box to the frame; boxes that fall below the size floor after
/// clipping are dropped.
fn clamp_box(rect: Rect, bounds: Rect, min_size: [i32; 2]) -> Option<Rect> {
    let x = rect.x.max(bounds.x);
    let y = rect.y.max(bounds.y);
    let right = (rect.x + rect.width).min(bounds.x + bounds.width);
    let bottom = (rect.y + rect.height).min(bounds.y + bounds.height);

    let clipped = Rect::new(x, y, right - x, bottom - y);
    if clipped.width >= min_size[0] && clipped.height >= min_size[1] {
        Some(clipped)
    } else {
        None
    }
}

/// Runs the car and pedestrian backends over a frame. The two searches are
/// independent reads of the same immutable frame writing to disjoint
/// outputs; they share no state.
pub struct DetectionStage {
    car: Box<dyn Detector>,
    pedestrian: Box<dyn Detector>,
}

impl DetectionStage {
    pub fn new(car: Box<dyn Detector>, pedestrian: Box<dyn Detector>) -> Self {
        Self { car, pedestrian }
    }

    pub fn run(&mut self, frame: &Mat) -> Result<FrameDetections> {
        let cars = self.car.detect(frame)?;
        let pedestrians = self.pedestrian.detect(frame)?;
        debug!(
            "{}: {} box(es), {}: {} box(es)",
            self.car.class().label(),
            cars.len(),
            self.pedestrian.class().label(),
            pedestrians.len()
        );
        Ok(FrameDetections { cars, pedestrians })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Minimal single-stage cascade that parses as a valid classifier
    const TINY_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>20</height>
  <width>20</width>
  <stageParams>
    <maxWeakCount>3</maxWeakCount>
  </stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount>
    <featSize>1</featSize>
    <mode>BASIC</mode>
  </featureParams>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>3</maxWeakCount>
      <stageThreshold>-1.0</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 -67108864</internalNodes>
          <leafValues>-1.0 1.0</leafValues>
        </_>
      </weakClassifiers>
    </_>
  </stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 20 20 -1.
        </_>
      </rects>
      <tilted>0</tilted>
    </_>
  </features>
</cascade>
</opencv_storage>"#;

    fn write_cascade(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("tiny.xml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(TINY_CASCADE.as_bytes()).unwrap();
        path
    }

    fn params() -> DetectorParams {
        DetectorParams {
            scale_factor: 1.1,
            min_neighbors: 0,
            min_size: [20, 20],
        }
    }

    fn blank_frame(width: i32, height: i32) -> Mat {
        Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, core::Scalar::all(127.0))
            .unwrap()
    }

    #[test]
    fn test_missing_cascade_is_model_load_error() {
        let err = CascadeDetector::new(
            Path::new("no/such/cascade.xml"),
            ObjectClass::Car,
            params(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad { .. }));
    }

    #[test]
    fn test_corrupt_cascade_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<not a cascade>").unwrap();

        let err = CascadeDetector::new(&path, ObjectClass::Car, params()).unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad { .. }));
    }

    #[test]
    fn test_boxes_respect_frame_bounds_and_size_floor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cascade(&dir);
        let mut detector = CascadeDetector::new(&path, ObjectClass::Car, params()).unwrap();

        let frame = blank_frame(160, 120);
        let boxes = detector.detect(&frame).unwrap();
        for b in &boxes {
            assert!(b.x >= 0 && b.y >= 0);
            assert!(b.x + b.width <= 160);
            assert!(b.y + b.height <= 120);
            assert!(b.width >= 20 && b.height >= 20);
        }
    }

    #[test]
    fn test_clamp_box_clips_and_filters() {
        let bounds = Rect::new(0, 0, 100, 100);
        // Hangs over the right edge, still large enough after clipping
        let clipped = clamp_box(Rect::new(70, 10, 40, 40), bounds, [20, 20]).unwrap();
        assert_eq!(clipped, Rect::new(70, 10, 30, 40));
        // Too small once clipped
        assert!(clamp_box(Rect::new(90, 10, 25, 40), bounds, [20, 20]).is_none());
    }

    struct FixedBoxes {
        class: ObjectClass,
        boxes: Vec<Rect>,
    }

    impl Detector for FixedBoxes {
        fn class(&self) -> ObjectClass {
            self.class
        }

        fn detect(&mut self, _frame: &Mat) -> Result<Vec<Rect>> {
            Ok(self.boxes.clone())
        }
    }

    #[test]
    fn test_stage_keeps_class_outputs_disjoint() {
        let mut stage = DetectionStage::new(
            Box::new(FixedBoxes {
                class: ObjectClass::Car,
                boxes: vec![Rect::new(0, 0, 30, 30), Rect::new(40, 0, 30, 30)],
            }),
            Box::new(FixedBoxes {
                class: ObjectClass::Pedestrian,
                boxes: vec![Rect::new(10, 50, 40, 80)],
            }),
        );

        let detections = stage.run(&blank_frame(320, 240)).unwrap();
        assert_eq!(detections.cars.len(), 2);
        assert_eq!(detections.pedestrians.len(), 1);
    }
}
