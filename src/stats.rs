// src/stats.rs

use opencv::core::Rect;
use serde::Serialize;

/// Running totals for one session. Owned exclusively by the session; no
/// shared or process-wide state.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStatistics {
    pub frames: u64,
    pub cars: u64,
    pub pedestrians: u64,
}

impl RunStatistics {
    /// Fold one frame's detections into the totals. Called exactly once per
    /// processed frame.
    pub fn record(&mut self, cars: &[Rect], pedestrians: &[Rect]) {
        self.frames += 1;
        self.cars += cars.len() as u64;
        self.pedestrians += pedestrians.len() as u64;
    }

    /// Zero the counters without touching any other session state.
    pub fn reset(&mut self) {
        *self = RunStatistics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes(n: usize) -> Vec<Rect> {
        (0..n).map(|i| Rect::new(i as i32 * 10, 0, 8, 8)).collect()
    }

    #[test]
    fn test_record_increments_per_frame() {
        let mut stats = RunStatistics::default();
        stats.record(&boxes(2), &boxes(1));
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.cars, 2);
        assert_eq!(stats.pedestrians, 1);

        stats.record(&boxes(0), &boxes(3));
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.cars, 2);
        assert_eq!(stats.pedestrians, 4);
    }

    #[test]
    fn test_counters_never_decrease_between_resets() {
        let mut stats = RunStatistics::default();
        let mut last = (0, 0, 0);
        for i in 0..20 {
            stats.record(&boxes(i % 3), &boxes(i % 2));
            assert!(stats.frames > last.0);
            assert!(stats.cars >= last.1);
            assert!(stats.pedestrians >= last.2);
            last = (stats.frames, stats.cars, stats.pedestrians);
        }
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut stats = RunStatistics::default();
        for _ in 0..5 {
            stats.record(&boxes(1), &boxes(2));
        }
        stats.reset();
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.cars, 0);
        assert_eq!(stats.pedestrians, 0);

        // Recording resumes from zero after a reset
        stats.record(&boxes(4), &boxes(0));
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.cars, 4);
        assert_eq!(stats.pedestrians, 0);
    }
}
