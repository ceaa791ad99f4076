//! Candidate corner detection on a resampled lap.
//!
//! Each detection approach is a [`SegmentStrategy`]. The braking state
//! machine is the primary strategy; [`CurvatureFallback`] only runs when it
//! finds nothing (see `analysis::CascadePolicy`).

use tracing::trace;

use crate::series::LapSeries;

/// Index range into a resampled series. Both endpoints are sampled by the
/// corner extractor; `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start < end, "segment must be non-empty");
        Self { start, end }
    }

    /// Number of sample steps covered.
    pub fn points(&self) -> usize {
        self.end - self.start
    }

    /// Path length covered on the given distance axis.
    pub fn span(&self, distance: &[f64]) -> f64 {
        distance[self.end] - distance[self.start]
    }
}

/// Series handed to every strategy: raw resampled channels plus the
/// smoothed driver inputs the heuristics scan.
pub struct SegmentInput<'a> {
    pub series: &'a LapSeries,
    pub smooth_speed: &'a [f64],
    pub smooth_brake: &'a [f64],
    pub smooth_throttle: &'a [f64],
}

impl SegmentInput<'_> {
    pub fn distance(&self) -> &[f64] {
        &self.series.distance
    }
}

/// A named way of proposing candidate corner ranges.
pub trait SegmentStrategy {
    fn name(&self) -> &'static str;
    fn detect(&self, input: &SegmentInput<'_>) -> Vec<Segment>;
}

// ---------- Braking state machine ----------

/// Hysteresis state of the brake scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeState {
    Idle,
    Braking {
        /// Index the candidate starts at (one before the trigger)
        start: usize,
        /// Consecutive samples with throttle at or above the exit threshold
        sustain: usize,
    },
}

/// Braking zones bounded by brake application and confirmed throttle
/// recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct BrakeStateMachine {
    pub brake_on: f64,
    pub brake_off: f64,
    pub throttle_exit: f64,
    /// Throttle samples required before a zone may close
    pub sustain_samples: usize,
    pub min_points: usize,
    pub min_distance: f64,
}

impl BrakeState {
    /// Advance the scanner by one sample.
    ///
    /// Returns the next state and, when a braking zone closes on this
    /// sample, its unfiltered range.
    pub fn step(
        self,
        idx: usize,
        brake: f64,
        throttle: f64,
        params: &BrakeStateMachine,
    ) -> (BrakeState, Option<Segment>) {
        match self {
            BrakeState::Idle if brake >= params.brake_on => (
                BrakeState::Braking {
                    start: idx.saturating_sub(1),
                    sustain: 0,
                },
                None,
            ),
            BrakeState::Idle => (BrakeState::Idle, None),
            BrakeState::Braking { start, sustain } => {
                let sustain = if throttle >= params.throttle_exit {
                    sustain + 1
                } else {
                    0
                };
                if brake <= params.brake_off && sustain >= params.sustain_samples {
                    let closed = (idx > start).then(|| Segment::new(start, idx));
                    (BrakeState::Idle, closed)
                } else {
                    (BrakeState::Braking { start, sustain }, None)
                }
            }
        }
    }
}

impl SegmentStrategy for BrakeStateMachine {
    fn name(&self) -> &'static str {
        "brake_state_machine"
    }

    fn detect(&self, input: &SegmentInput<'_>) -> Vec<Segment> {
        let distance = input.distance();
        let mut state = BrakeState::Idle;
        let mut segments = Vec::new();

        for (idx, (&brake, &throttle)) in input
            .smooth_brake
            .iter()
            .zip(input.smooth_throttle)
            .enumerate()
        {
            let (next, closed) = state.step(idx, brake, throttle, self);
            state = next;
            let Some(seg) = closed else { continue };

            if seg.points() >= self.min_points && seg.span(distance) >= self.min_distance {
                segments.push(seg);
            } else {
                trace!(start = seg.start, end = seg.end, "dropping short braking zone");
            }
        }

        segments
    }
}

// ---------- Curvature fallback ----------

/// Corners from path geometry: runs of high curvature above a percentile
/// threshold of the whole lap.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureFallback {
    /// Fraction in `[0, 1)` selecting the threshold from sorted curvature
    pub percentile: f64,
    pub min_distance: f64,
}

impl SegmentStrategy for CurvatureFallback {
    fn name(&self) -> &'static str {
        "curvature"
    }

    fn detect(&self, input: &SegmentInput<'_>) -> Vec<Segment> {
        let series = input.series;
        if !series.has_positions() {
            return Vec::new();
        }

        let kappa = curvature(&series.x, &series.y);
        if kappa.iter().all(|&k| k == 0.0) {
            return Vec::new();
        }

        let mut sorted = kappa.clone();
        sorted.sort_by(f64::total_cmp);
        let rank = ((sorted.len() as f64 * self.percentile) as usize).min(sorted.len() - 1);
        let threshold = sorted[rank];

        let distance = input.distance();
        let n = kappa.len();
        let mut segments = Vec::new();
        let mut i = 1;
        while i < n {
            while i < n && kappa[i] <= threshold {
                i += 1;
            }
            if i >= n {
                break;
            }
            let start = i;
            while i < n && kappa[i] > threshold {
                i += 1;
            }
            let end = i.min(n - 1);
            if end > start && distance[end] - distance[start] >= self.min_distance {
                segments.push(Segment::new(start, end));
            }
            i = end + 1;
        }

        segments
    }
}

/// Central difference with boundaries clamped to the nearest interior value.
fn derivative(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut d = vec![0.0; n];
    if n < 3 {
        return d;
    }
    for i in 1..n - 1 {
        d[i] = (values[i + 1] - values[i - 1]) / 2.0;
    }
    d[0] = d[1];
    d[n - 1] = d[n - 2];
    d
}

/// Unsigned curvature of the planar path at every index.
pub fn curvature(x: &[f64], y: &[f64]) -> Vec<f64> {
    let dx = derivative(x);
    let dy = derivative(y);
    let ddx = derivative(&dx);
    let ddy = derivative(&dy);

    (0..dx.len())
        .map(|i| {
            let numerator = (dx[i] * ddy[i] - dy[i] * ddx[i]).abs();
            let denom = (dx[i] * dx[i] + dy[i] * dy[i]).powf(1.5);
            if denom == 0.0 {
                0.0
            } else {
                numerator / denom
            }
        })
        .collect()
}

// ---------- Merge ----------

/// Sort candidates by start distance and fuse those separated by at most
/// `gap` distance units.
pub fn merge_segments(mut segments: Vec<Segment>, distance: &[f64], gap: f64) -> Vec<Segment> {
    segments.sort_by(|a, b| distance[a.start].total_cmp(&distance[b.start]));

    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        match merged.last_mut() {
            Some(prev) if distance[seg.start] - distance[prev.end] <= gap => {
                prev.end = prev.end.max(seg.end);
            }
            _ => merged.push(seg),
        }
    }
    merged
}
