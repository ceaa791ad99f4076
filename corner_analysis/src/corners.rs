use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::segment::{Segment, SegmentInput, SegmentStrategy};
use crate::series::LapSeries;

/// Kinematic summary of one detected corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    /// 1-based position along the lap, assigned by the selector
    pub corner: u32,
    pub distance_start: f64,
    pub distance_end: f64,
    pub entry_speed: f64,
    pub apex_speed: f64,
    pub exit_speed: f64,
    pub brake_peak: f64,
    pub throttle_exit: f64,
    /// Comparison minus reference time through the corner, seconds
    pub delta_s: Option<f64>,
}

impl Corner {
    pub fn speed_drop(&self) -> f64 {
        self.entry_speed - self.apex_speed
    }
}

/// Turns segments into corners, rejecting the ones without a meaningful
/// deceleration or braking effort.
pub struct CornerExtractor<'a> {
    pub reference: &'a LapSeries,
    /// Comparison lap resampled on the reference grid
    pub comparison: Option<&'a LapSeries>,
    pub min_distance: f64,
    pub min_time: f64,
    pub min_drop: f64,
    pub min_peak_brake: f64,
}

impl CornerExtractor<'_> {
    /// Build the corner for `seg`, or `None` when a rejection rule applies.
    pub fn extract(&self, seg: Segment) -> Option<Corner> {
        let r = self.reference;
        let Segment { start, end } = seg;

        if seg.span(&r.distance) < self.min_distance {
            return None;
        }
        let ref_dt = r.time_span(start, end);
        if ref_dt < self.min_time {
            return None;
        }

        let window = &r.speed[start..=end];
        let apex_speed = window
            .iter()
            .copied()
            .fold(f64::INFINITY, |min, v| if v < min { v } else { min });
        let brake_peak = r.brake[start..=end]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let entry_speed = r.speed[start];

        if entry_speed - apex_speed < self.min_drop && brake_peak < self.min_peak_brake {
            trace!(start, end, "segment shows neither speed drop nor braking");
            return None;
        }

        let delta_s = self
            .comparison
            .map(|cmp| cmp.time_span(start, end) - ref_dt);

        Some(Corner {
            corner: 0,
            distance_start: r.distance[start],
            distance_end: r.distance[end],
            entry_speed,
            apex_speed,
            exit_speed: r.speed[end],
            brake_peak,
            throttle_exit: r.throttle[end],
            delta_s,
        })
    }

    pub fn extract_all(&self, segments: &[Segment]) -> Vec<Corner> {
        segments.iter().filter_map(|&s| self.extract(s)).collect()
    }
}

/// Corners around local minima of the smoothed speed trace.
///
/// Catches slow corners taken without a clear braking signature.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMinima {
    /// Distance searched before the apex for the entry maximum
    pub pre_window: f64,
    /// Distance searched after the apex for the exit maximum
    pub post_window: f64,
    pub min_drop: f64,
    pub min_distance: f64,
}

impl SegmentStrategy for SpeedMinima {
    fn name(&self) -> &'static str {
        "speed_minima"
    }

    fn detect(&self, input: &SegmentInput<'_>) -> Vec<Segment> {
        let dist = input.distance();
        let speed = input.smooth_speed;
        let n = dist.len().min(speed.len());
        let mut segments = Vec::new();

        for i in 2..n.saturating_sub(2) {
            if !(speed[i] < speed[i - 1] && speed[i] <= speed[i + 1]) {
                continue;
            }

            let apex_d = dist[i];
            let mut left = i;
            while left > 0 && apex_d - dist[left - 1] <= self.pre_window {
                left -= 1;
            }
            let mut right = i;
            while right < n - 1 && dist[right + 1] - apex_d <= self.post_window {
                right += 1;
            }

            let peak = |s: &[f64]| s.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let apex_speed = speed[i];
            let drop = (peak(&speed[left..=i]) - apex_speed).max(peak(&speed[i..=right]) - apex_speed);
            if drop < self.min_drop {
                continue;
            }

            let mut start = i;
            while start > left && speed[start - 1] >= speed[start] {
                start -= 1;
            }
            let mut end = i;
            while end < right && speed[end + 1] >= speed[end] {
                end += 1;
            }

            if end <= start || dist[end] - dist[start] < self.min_distance {
                continue;
            }
            segments.push(Segment::new(start, end));
        }

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_from(speed: &[f64], brake: &[f64]) -> LapSeries {
        let n = speed.len();
        LapSeries {
            distance: (0..n).map(|i| i as f64 * 5.0).collect(),
            time: (0..n).map(|i| i as f64 * 0.1).collect(),
            speed: speed.to_vec(),
            throttle: (0..n).map(|i| i as f64).collect(),
            brake: brake.to_vec(),
            x: vec![0.0; n],
            y: vec![0.0; n],
        }
    }

    fn extractor(series: &LapSeries) -> CornerExtractor<'_> {
        CornerExtractor {
            reference: series,
            comparison: None,
            min_distance: 14.0,
            min_time: 0.15,
            min_drop: 9.0,
            min_peak_brake: 0.5,
        }
    }

    #[test]
    fn test_extracts_features() {
        let speed = [250.0, 240.0, 180.0, 120.0, 120.0, 150.0, 200.0];
        let brake = [0.0, 60.0, 90.0, 30.0, 0.0, 0.0, 0.0];
        let series = series_from(&speed, &brake);

        let corner = extractor(&series).extract(Segment::new(0, 6)).unwrap();
        assert_eq!(corner.distance_start, 0.0);
        assert_eq!(corner.distance_end, 30.0);
        assert_eq!(corner.entry_speed, 250.0);
        assert_eq!(corner.apex_speed, 120.0);
        assert_eq!(corner.exit_speed, 200.0);
        assert_eq!(corner.brake_peak, 90.0);
        assert_eq!(corner.throttle_exit, 6.0);
        assert_eq!(corner.speed_drop(), 130.0);
        assert!(corner.delta_s.is_none());
    }

    #[test]
    fn test_rejects_short_or_flat_segments() {
        let speed = [200.0; 10];
        let brake = [0.0; 10];
        let series = series_from(&speed, &brake);
        let ex = extractor(&series);

        // 10 units < min_distance
        assert!(ex.extract(Segment::new(0, 2)).is_none());
        // no drop and no braking
        assert!(ex.extract(Segment::new(0, 8)).is_none());

        let braking = series_from(&speed, &[1.0; 10]);
        assert!(extractor(&braking).extract(Segment::new(0, 8)).is_some());
    }

    #[test]
    fn test_rejects_segments_faster_than_min_time() {
        let speed = [200.0, 150.0, 100.0, 150.0, 200.0];
        let mut series = series_from(&speed, &[10.0; 5]);
        series.time = vec![0.0, 0.01, 0.02, 0.03, 0.04];
        assert!(extractor(&series).extract(Segment::new(0, 4)).is_none());
    }

    #[test]
    fn test_delta_against_comparison() {
        let speed = [200.0, 150.0, 100.0, 150.0, 200.0];
        let series = series_from(&speed, &[10.0; 5]);
        let mut slower = series.clone();
        slower.time = vec![0.0, 0.2, 0.4, 0.6, 0.8];

        let ex = CornerExtractor {
            comparison: Some(&slower),
            ..extractor(&series)
        };
        let corner = ex.extract(Segment::new(1, 4)).unwrap();
        // reference 0.3s, comparison 0.6s
        assert!((corner.delta_s.unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_speed_minima_trims_to_monotonic_runs() {
        let mut speed = vec![150.0, 175.0];
        speed.extend(vec![200.0; 10]);
        speed.extend([190.0, 170.0, 140.0, 110.0, 100.0, 120.0, 150.0, 180.0, 200.0]);
        speed.extend([200.0, 205.0]);
        speed.extend(vec![204.0; 10]);
        let series = series_from(&speed, &vec![0.0; speed.len()]);
        let input = SegmentInput {
            series: &series,
            smooth_speed: &speed,
            smooth_brake: &series.brake,
            smooth_throttle: &series.throttle,
        };

        let minima = SpeedMinima {
            pre_window: 120.0,
            post_window: 160.0,
            min_drop: 9.0,
            min_distance: 14.0,
        };
        let segments = minima.detect(&input);
        assert_eq!(segments, vec![Segment::new(2, 22)]);
    }

    #[test]
    fn test_speed_minima_ignores_shallow_dips() {
        let mut speed = vec![200.0; 10];
        speed.extend([198.0, 196.0, 198.0]);
        speed.extend(vec![200.0; 10]);
        let series = series_from(&speed, &vec![0.0; speed.len()]);
        let input = SegmentInput {
            series: &series,
            smooth_speed: &speed,
            smooth_brake: &series.brake,
            smooth_throttle: &series.throttle,
        };
        let minima = SpeedMinima {
            pre_window: 120.0,
            post_window: 160.0,
            min_drop: 9.0,
            min_distance: 14.0,
        };
        assert!(minima.detect(&input).is_empty());
    }
}
