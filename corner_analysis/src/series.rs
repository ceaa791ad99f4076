use serde::{Deserialize, Serialize};

/// One raw telemetry sample as delivered by the data-access layer.
///
/// Every field is nullable; samples without position or timestamp are
/// discarded when the series is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp in seconds, non-decreasing within a lap
    pub ts: Option<f64>,
    pub speed: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    /// Planar position
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Parallel per-sample channels indexed by cumulative path distance.
///
/// Used both for the raw distance series and for its resampled form. All
/// fields always have the same length and `distance` never decreases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapSeries {
    pub distance: Vec<f64>,
    /// Seconds since the first valid sample
    pub time: Vec<f64>,
    pub speed: Vec<f64>,
    pub throttle: Vec<f64>,
    pub brake: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl LapSeries {
    fn with_capacity(n: usize) -> Self {
        Self {
            distance: Vec::with_capacity(n),
            time: Vec::with_capacity(n),
            speed: Vec::with_capacity(n),
            throttle: Vec::with_capacity(n),
            brake: Vec::with_capacity(n),
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    /// Total path length covered by the series.
    pub fn total_distance(&self) -> f64 {
        self.distance.last().copied().unwrap_or(0.0)
    }

    /// Whether the series carries enough positions for geometric analysis.
    pub fn has_positions(&self) -> bool {
        self.x.len() > 2 && self.y.len() > 2
    }

    /// Elapsed time between two indices of the series.
    pub fn time_span(&self, start: usize, end: usize) -> f64 {
        self.time[end] - self.time[start]
    }
}

/// Build a distance-indexed series from the raw samples of one lap.
///
/// Returns `None` when fewer than two samples carry both position and
/// timestamp. Missing speed, throttle and brake values repeat the previous
/// sample's value (zero on the first sample).
pub fn build_series(samples: &[Sample]) -> Option<LapSeries> {
    let valid: Vec<(f64, f64, f64, &Sample)> = samples
        .iter()
        .filter_map(|s| match (s.ts, s.x, s.y) {
            (Some(ts), Some(x), Some(y)) => Some((ts, x, y, s)),
            _ => None,
        })
        .collect();

    if valid.len() < 2 {
        return None;
    }

    let mut series = LapSeries::with_capacity(valid.len());
    let (start_ts, mut prev_x, mut prev_y, _) = valid[0];
    let mut distance = 0.0;
    let mut speed = 0.0;
    let mut throttle = 0.0;
    let mut brake = 0.0;

    for (ts, x, y, sample) in valid {
        distance += (x - prev_x).hypot(y - prev_y);
        speed = sample.speed.unwrap_or(speed);
        throttle = sample.throttle.unwrap_or(throttle);
        brake = sample.brake.unwrap_or(brake);

        series.distance.push(distance);
        series.time.push(ts - start_ts);
        series.speed.push(speed);
        series.throttle.push(throttle);
        series.brake.push(brake);
        series.x.push(x);
        series.y.push(y);

        prev_x = x;
        prev_y = y;
    }

    Some(series)
}
