// src/overlay.rs

use crate::error::Result;
use crate::stats::RunStatistics;
use crate::types::{FrameDetections, ObjectClass, OverlayConfig};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

const PANEL_ORIGIN: (i32, i32) = (10, 10);
const PANEL_WIDTH: i32 = 240;
const PANEL_LINE_HEIGHT: i32 = 20;
const PANEL_FONT_SCALE: f64 = 0.5;

/// Draw detections and the statistics panel onto a copy of the frame.
///
/// Pure: identical inputs produce bit-identical output, and the input frame
/// is never written to.
pub fn render(
    frame: &Mat,
    detections: &FrameDetections,
    stats: &RunStatistics,
    style: &OverlayConfig,
) -> Result<Mat> {
    let mut annotated = frame.try_clone()?;

    draw_boxes(
        &mut annotated,
        &detections.cars,
        ObjectClass::Car,
        scalar(style.car_color),
        style,
    )?;
    draw_boxes(
        &mut annotated,
        &detections.pedestrians,
        ObjectClass::Pedestrian,
        scalar(style.pedestrian_color),
        style,
    )?;

    draw_stats_panel(&mut annotated, stats, style)?;
    Ok(annotated)
}

fn draw_boxes(
    frame: &mut Mat,
    boxes: &[Rect],
    class: ObjectClass,
    color: Scalar,
    style: &OverlayConfig,
) -> Result<()> {
    let shadow = scalar(style.shadow_color);

    for rect in boxes {
        // Offset duplicate behind the box, visual contrast only
        let shadow_rect = Rect::new(
            rect.x + style.shadow_offset,
            rect.y + style.shadow_offset,
            rect.width,
            rect.height,
        );
        imgproc::rectangle(
            frame,
            shadow_rect,
            shadow,
            style.box_thickness,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::rectangle(frame, *rect, color, style.box_thickness, imgproc::LINE_8, 0)?;

        imgproc::put_text(
            frame,
            class.label(),
            Point::new(rect.x, (rect.y - 10).max(10)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            style.font_scale,
            color,
            style.text_thickness,
            imgproc::LINE_8,
            false,
        )?;
    }
    Ok(())
}

fn draw_stats_panel(frame: &mut Mat, stats: &RunStatistics, style: &OverlayConfig) -> Result<()> {
    let lines = [
        format!("Frame: {}", stats.frames),
        format!("Cars: {}", stats.cars),
        format!("Pedestrians: {}", stats.pedestrians),
        String::new(),
        "Controls:".to_string(),
        "Q/K - quit".to_string(),
        "S - save snapshot".to_string(),
        "R - reset counters".to_string(),
    ];

    let panel = Rect::new(
        PANEL_ORIGIN.0,
        PANEL_ORIGIN.1,
        PANEL_WIDTH,
        PANEL_LINE_HEIGHT * lines.len() as i32 + 16,
    );

    // Blend a darkened copy over the frame so the panel stays readable
    // without fully hiding what is behind it
    let mut overlay = frame.try_clone()?;
    imgproc::rectangle(
        &mut overlay,
        panel,
        Scalar::all(0.0),
        -1,
        imgproc::LINE_8,
        0,
    )?;
    let mut blended = Mat::default();
    core::add_weighted(
        &overlay,
        style.panel_alpha,
        frame,
        1.0 - style.panel_alpha,
        0.0,
        &mut blended,
        -1,
    )?;
    *frame = blended;

    let mut y = PANEL_ORIGIN.1 + PANEL_LINE_HEIGHT;
    for line in &lines {
        if !line.is_empty() {
            imgproc::put_text(
                frame,
                line,
                Point::new(PANEL_ORIGIN.0 + 10, y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                PANEL_FONT_SCALE,
                Scalar::all(255.0),
                1,
                imgproc::LINE_8,
                false,
            )?;
        }
        y += PANEL_LINE_HEIGHT;
    }
    Ok(())
}

fn scalar(color: [u8; 3]) -> Scalar {
    Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Mat {
        Mat::new_rows_cols_with_default(240, 320, core::CV_8UC3, core::Scalar::all(90.0)).unwrap()
    }

    fn detections() -> FrameDetections {
        FrameDetections {
            cars: vec![Rect::new(40, 60, 50, 30)],
            pedestrians: vec![Rect::new(150, 80, 40, 80)],
        }
    }

    fn stats() -> RunStatistics {
        RunStatistics {
            frames: 12,
            cars: 7,
            pedestrians: 3,
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let frame = frame();
        let style = OverlayConfig::default();

        let a = render(&frame, &detections(), &stats(), &style).unwrap();
        let b = render(&frame, &detections(), &stats(), &style).unwrap();
        assert_eq!(a.data_bytes().unwrap(), b.data_bytes().unwrap());
    }

    #[test]
    fn test_render_leaves_input_untouched() {
        let frame = frame();
        let before = frame.data_bytes().unwrap().to_vec();

        let _ = render(&frame, &detections(), &stats(), &OverlayConfig::default()).unwrap();
        assert_eq!(frame.data_bytes().unwrap(), before.as_slice());
    }

    #[test]
    fn test_boxes_change_output() {
        let frame = frame();
        let style = OverlayConfig::default();

        let empty = render(&frame, &FrameDetections::default(), &stats(), &style).unwrap();
        let drawn = render(&frame, &detections(), &stats(), &style).unwrap();
        assert_ne!(empty.data_bytes().unwrap(), drawn.data_bytes().unwrap());
    }

    #[test]
    fn test_panel_is_blended_not_opaque() {
        let frame = frame();
        let mut style = OverlayConfig::default();
        style.panel_alpha = 0.5;

        let rendered = render(&frame, &FrameDetections::default(), &stats(), &style).unwrap();
        // A pixel inside the panel but away from any text: darkened by the
        // blend, not black
        let px = *rendered.at_2d::<core::Vec3b>(150, 230).unwrap();
        assert!(px[0] > 0 && px[0] < 90);
    }
}
