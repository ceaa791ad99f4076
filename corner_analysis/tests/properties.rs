//! Property-based tests for the resampler, smoother and corner pipeline.

use corner_analysis::resample::{resample, resample_uniform, uniform_grid};
use corner_analysis::smooth::moving_average;
use corner_analysis::{analyze_lap, build_series, AnalysisConfig, Sample};
use proptest::prelude::*;

/// (step length, heading change, speed, throttle, brake) per sample.
fn lap_strategy() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec(
        (
            0.5f64..10.0,
            -0.3f64..0.3,
            40.0f64..320.0,
            0.0f64..100.0,
            0.0f64..100.0,
        ),
        2..300,
    )
    .prop_map(|steps| {
        let (mut x, mut y, mut heading, mut ts) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        steps
            .into_iter()
            .map(|(len, turn, speed, throttle, brake)| {
                heading += turn;
                x += len * heading.cos();
                y += len * heading.sin();
                ts += len / (speed / 3.6);
                Sample {
                    ts: Some(ts),
                    speed: Some(speed),
                    throttle: Some(throttle),
                    brake: Some(brake),
                    x: Some(x),
                    y: Some(y),
                }
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every resampled channel has exactly one value per grid point.
    #[test]
    fn prop_resampled_lengths_match_grid(lap in lap_strategy(), step in 0.5f64..25.0) {
        let series = build_series(&lap).expect("at least two positioned samples");
        let out = resample_uniform(&series, step);
        let n = out.distance.len();
        prop_assert_eq!(out.time.len(), n);
        prop_assert_eq!(out.speed.len(), n);
        prop_assert_eq!(out.throttle.len(), n);
        prop_assert_eq!(out.brake.len(), n);
        prop_assert_eq!(out.x.len(), n);
        prop_assert_eq!(out.y.len(), n);
    }

    /// The grid is non-decreasing, bounded by the lap length and ends on it.
    #[test]
    fn prop_grid_bounds(total in 0.0f64..10_000.0, step in 0.5f64..50.0) {
        let grid = uniform_grid(total, step);
        prop_assert!(grid.len() >= 2);
        prop_assert!(grid.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(grid.iter().all(|&g| g <= total));
        prop_assert_eq!(*grid.last().unwrap(), total);
    }

    /// A foreign grid longer than the lap clamps instead of extrapolating.
    #[test]
    fn prop_foreign_grid_clamps(lap in lap_strategy()) {
        let series = build_series(&lap).expect("at least two positioned samples");
        let grid = uniform_grid(series.total_distance() * 2.0, 5.0);
        let out = resample(&series, &grid);
        let last_time = *series.time.last().unwrap();
        prop_assert!(out.time.iter().all(|&t| t <= last_time + 1e-9));
    }

    #[test]
    fn prop_moving_average_identity(values in prop::collection::vec(-1e3f64..1e3, 0..40), window in 0usize..2) {
        prop_assert_eq!(moving_average(&values, window), values);
    }

    #[test]
    fn prop_moving_average_short_input(values in prop::collection::vec(-1e3f64..1e3, 0..3), window in 0usize..20) {
        prop_assert_eq!(moving_average(&values, window), values);
    }

    /// Corner list ordering, numbering, minimum length and loss ranking.
    #[test]
    fn prop_report_invariants(lap in lap_strategy(), slowdown in 0.8f64..1.25) {
        let comparison: Vec<Sample> = lap
            .iter()
            .map(|s| Sample { ts: s.ts.map(|t| t * slowdown), ..*s })
            .collect();
        let config = AnalysisConfig::default();
        let report = analyze_lap(&lap, Some(&comparison), &config);

        for (idx, c) in report.corners.iter().enumerate() {
            prop_assert_eq!(c.corner as usize, idx + 1);
            prop_assert!(c.distance_end > c.distance_start);
            prop_assert!(c.distance_end - c.distance_start >= config.min_distance);
            prop_assert!(c.delta_s.is_some());
        }
        prop_assert!(report
            .corners
            .windows(2)
            .all(|w| w[0].distance_start <= w[1].distance_start));
        prop_assert!(report.corners.len() <= config.policy.max_corners);

        prop_assert!(report.top_losses.len() <= 3);
        prop_assert!(report.top_losses.iter().all(|l| l.delta_s > 0.0));
        prop_assert!(report
            .top_losses
            .windows(2)
            .all(|w| w[0].delta_s >= w[1].delta_s));
    }

    /// Without a comparison lap no corner carries a delta.
    #[test]
    fn prop_no_comparison_no_delta(lap in lap_strategy()) {
        let report = analyze_lap(&lap, None, &AnalysisConfig::default());
        prop_assert!(report.corners.iter().all(|c| c.delta_s.is_none()));
        prop_assert!(report.top_losses.is_empty());
    }

    #[test]
    fn prop_deterministic(lap in lap_strategy()) {
        let config = AnalysisConfig::default();
        prop_assert_eq!(analyze_lap(&lap, None, &config), analyze_lap(&lap, None, &config));
    }
}
