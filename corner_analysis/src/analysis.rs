//! End-to-end corner analysis of one lap against an optional comparison lap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corners::{Corner, CornerExtractor, SpeedMinima};
use crate::error::AnalysisError;
use crate::losses::{top_losses, CornerLoss};
use crate::resample::{resample, resample_uniform, DEFAULT_STEP, MAX_GRID_POINTS};
use crate::segment::{
    merge_segments, BrakeStateMachine, CurvatureFallback, Segment, SegmentInput, SegmentStrategy,
};
use crate::select::{select_corners, DEFAULT_MAX_CORNERS};
use crate::series::{build_series, LapSeries, Sample};
use crate::smooth::{moving_average, DEFAULT_WINDOW, MAX_WINDOW};

// ---------- Configuration ----------

/// Per-request thresholds, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub resample_step: f64,
    pub brake_on: f64,
    pub brake_off: f64,
    pub throttle_exit: f64,
    pub min_distance: f64,
    /// Minimum speed drop, kph
    pub min_drop: f64,
    /// Minimum time through a corner, seconds
    pub min_time: f64,
    pub min_peak_brake: f64,
    /// Inputs are reported as 0-1 fractions rather than percent
    pub scale01: bool,
    pub policy: DetectionPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            resample_step: DEFAULT_STEP,
            brake_on: 3.0,
            brake_off: 1.5,
            throttle_exit: 40.0,
            min_distance: 14.0,
            min_drop: 9.0,
            min_time: 0.15,
            min_peak_brake: 0.5,
            scale01: false,
            policy: DetectionPolicy::default(),
        }
    }
}

/// Thresholds after percent-to-fraction scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub brake_on: f64,
    pub brake_off: f64,
    pub throttle_exit: f64,
    pub min_distance: f64,
    pub min_drop: f64,
    pub min_time: f64,
    pub min_peak_brake: f64,
}

impl AnalysisConfig {
    /// Effective thresholds; pedal thresholds are divided by 100 when
    /// `scale01` is set.
    pub fn thresholds(&self) -> Thresholds {
        let scale = if self.scale01 { 100.0 } else { 1.0 };
        Thresholds {
            brake_on: self.brake_on / scale,
            brake_off: self.brake_off / scale,
            throttle_exit: self.throttle_exit / scale,
            min_distance: self.min_distance,
            min_drop: self.min_drop,
            min_time: self.min_time,
            min_peak_brake: self.min_peak_brake / scale,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.resample_step.is_finite() && self.resample_step > 0.0) {
            return Err(AnalysisError::InvalidConfig {
                field: "resample_step",
                value: self.resample_step,
            });
        }
        let fields = [
            ("brake_on", self.brake_on),
            ("brake_off", self.brake_off),
            ("throttle_exit", self.throttle_exit),
            ("min_distance", self.min_distance),
            ("min_drop", self.min_drop),
            ("min_time", self.min_time),
            ("min_peak_brake", self.min_peak_brake),
        ];
        if let Some(&(field, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnalysisError::InvalidConfig { field, value });
        }
        self.policy.validate()
    }

    /// Reject a step that would resample a lap of `total_distance` onto
    /// more than [`MAX_GRID_POINTS`] points.
    pub fn check_grid(&self, total_distance: f64) -> Result<(), AnalysisError> {
        if total_distance / self.resample_step > MAX_GRID_POINTS as f64 {
            return Err(AnalysisError::InvalidConfig {
                field: "resample_step",
                value: self.resample_step,
            });
        }
        Ok(())
    }
}

/// When the fallback strategies are allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadePolicy {
    /// Curvature runs when braking produced fewer segments than this
    pub curvature_below_segments: usize,
    /// Speed minima run when fewer corners than this survived extraction
    pub speed_minima_below_corners: usize,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            curvature_below_segments: 1,
            speed_minima_below_corners: 12,
        }
    }
}

impl CascadePolicy {
    pub fn run_curvature(&self, braking_segments: usize) -> bool {
        braking_segments < self.curvature_below_segments
    }

    pub fn run_speed_minima(&self, corners: usize) -> bool {
        corners < self.speed_minima_below_corners
    }
}

/// Structural constants of the detector. The defaults are empirical and
/// not tied to any circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionPolicy {
    pub smoothing_window: usize,
    pub min_points: usize,
    pub sustain_samples: usize,
    pub merge_gap: f64,
    pub curvature_percentile: f64,
    pub pre_window: f64,
    pub post_window: f64,
    pub max_corners: usize,
    pub cascade: CascadePolicy,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_WINDOW,
            min_points: 3,
            sustain_samples: 3,
            merge_gap: 60.0,
            curvature_percentile: 0.8,
            pre_window: 120.0,
            post_window: 160.0,
            max_corners: DEFAULT_MAX_CORNERS,
            cascade: CascadePolicy::default(),
        }
    }
}

impl DetectionPolicy {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |field, value| Err(AnalysisError::InvalidConfig { field, value });

        if self.smoothing_window > MAX_WINDOW {
            return invalid("smoothing_window", self.smoothing_window as f64);
        }
        if !(0.0..1.0).contains(&self.curvature_percentile) {
            return invalid("curvature_percentile", self.curvature_percentile);
        }
        let distances = [
            ("merge_gap", self.merge_gap),
            ("pre_window", self.pre_window),
            ("post_window", self.post_window),
        ];
        match distances.iter().find(|(_, v)| !(v.is_finite() && *v >= 0.0)) {
            Some(&(field, value)) => invalid(field, value),
            None => Ok(()),
        }
    }
}

// ---------- Output ----------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerReport {
    pub corners: Vec<Corner>,
    pub top_losses: Vec<CornerLoss>,
}

// ---------- Pipeline ----------

/// Analyze a reference lap, never failing: any [`AnalysisError`] yields an
/// empty report.
pub fn analyze_lap(
    reference: &[Sample],
    comparison: Option<&[Sample]>,
    config: &AnalysisConfig,
) -> CornerReport {
    try_analyze_lap(reference, comparison, config).unwrap_or_else(|e| {
        debug!(error = %e, "corner analysis degraded to empty report");
        CornerReport::default()
    })
}

/// Analyze a reference lap, reporting why no corners could be produced.
///
/// A comparison lap that was supplied but cannot be built aborts the whole
/// analysis rather than falling back to reference-only output.
pub fn try_analyze_lap(
    reference: &[Sample],
    comparison: Option<&[Sample]>,
    config: &AnalysisConfig,
) -> Result<CornerReport, AnalysisError> {
    config.validate()?;

    let ref_series = build_series(reference).ok_or(AnalysisError::InsufficientData)?;
    config.check_grid(ref_series.total_distance())?;
    let cmp_series = match comparison {
        Some(samples) => Some(build_series(samples).ok_or(AnalysisError::MissingComparisonSeries)?),
        None => None,
    };

    let ref_resampled = resample_uniform(&ref_series, config.resample_step);
    let cmp_resampled = cmp_series
        .as_ref()
        .map(|s| resample(s, &ref_resampled.distance));

    let corners = detect_corners(
        &ref_resampled,
        cmp_resampled.as_ref(),
        &config.thresholds(),
        &config.policy,
    );
    let top_losses = top_losses(&corners);

    Ok(CornerReport { corners, top_losses })
}

/// Detect, extract and select corners on an already resampled lap.
///
/// # Arguments
/// * `reference` - Resampled reference lap
/// * `comparison` - Comparison lap resampled on the reference grid
/// * `thresholds` - Effective (already scaled) thresholds
/// * `policy` - Structural constants and fallback triggers
pub fn detect_corners(
    reference: &LapSeries,
    comparison: Option<&LapSeries>,
    thresholds: &Thresholds,
    policy: &DetectionPolicy,
) -> Vec<Corner> {
    let smooth_speed = moving_average(&reference.speed, policy.smoothing_window);
    let smooth_brake = moving_average(&reference.brake, policy.smoothing_window);
    let smooth_throttle = moving_average(&reference.throttle, policy.smoothing_window);
    let input = SegmentInput {
        series: reference,
        smooth_speed: &smooth_speed,
        smooth_brake: &smooth_brake,
        smooth_throttle: &smooth_throttle,
    };

    let braking = BrakeStateMachine {
        brake_on: thresholds.brake_on,
        brake_off: thresholds.brake_off,
        throttle_exit: thresholds.throttle_exit,
        sustain_samples: policy.sustain_samples,
        min_points: policy.min_points,
        min_distance: thresholds.min_distance,
    };
    let mut segments = run_strategy(&braking, &input);

    if policy.cascade.run_curvature(segments.len()) {
        let curvature = CurvatureFallback {
            percentile: policy.curvature_percentile,
            min_distance: thresholds.min_distance,
        };
        segments.extend(run_strategy(&curvature, &input));
    }

    let merged = merge_segments(segments, &reference.distance, policy.merge_gap);

    let extractor = CornerExtractor {
        reference,
        comparison,
        min_distance: thresholds.min_distance,
        min_time: thresholds.min_time,
        min_drop: thresholds.min_drop,
        min_peak_brake: thresholds.min_peak_brake,
    };
    let mut corners = extractor.extract_all(&merged);

    if policy.cascade.run_speed_minima(corners.len()) {
        let minima = SpeedMinima {
            pre_window: policy.pre_window,
            post_window: policy.post_window,
            min_drop: thresholds.min_drop,
            min_distance: thresholds.min_distance,
        };
        let extra = extractor.extract_all(&run_strategy(&minima, &input));
        corners.extend(extra);
    }

    select_corners(corners, policy.max_corners)
}

fn run_strategy(strategy: &dyn SegmentStrategy, input: &SegmentInput<'_>) -> Vec<Segment> {
    let segments = strategy.detect(input);
    debug!(strategy = strategy.name(), segments = segments.len(), "segment strategy finished");
    segments
}
