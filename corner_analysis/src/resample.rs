use crate::series::LapSeries;

/// Default distance between grid points.
pub const DEFAULT_STEP: f64 = 5.0;

/// Largest grid a single lap may be resampled onto.
pub const MAX_GRID_POINTS: usize = 500_000;

/// Build a uniform distance grid `0, step, 2*step, ...` over `total`.
///
/// The last point is always exactly `total`. A zero-length lap still
/// produces a two-point grid so downstream code can index both ends.
pub fn uniform_grid(total: f64, step: f64) -> Vec<f64> {
    let steps = ((total / step) as usize).max(1);
    let mut grid: Vec<f64> = (0..=steps).map(|i| total.min(i as f64 * step)).collect();
    if grid.last().copied() != Some(total) {
        grid.push(total);
    }
    grid
}

/// Resample `series` onto its own uniform grid with the given step.
pub fn resample_uniform(series: &LapSeries, step: f64) -> LapSeries {
    let grid = uniform_grid(series.total_distance(), step);
    resample(series, &grid)
}

/// Linearly interpolate every channel of `series` at each grid distance.
///
/// Grid points beyond the last sample clamp to the last sample's values.
/// Coincident sample distances interpolate with ratio 0.
///
/// # Arguments
/// * `series` - Distance series with at least two samples
/// * `grid` - Non-decreasing target distances, possibly from another lap
pub fn resample(series: &LapSeries, grid: &[f64]) -> LapSeries {
    let dist = &series.distance;
    let n = dist.len();
    let mut out = LapSeries {
        distance: grid.to_vec(),
        time: Vec::with_capacity(grid.len()),
        speed: Vec::with_capacity(grid.len()),
        throttle: Vec::with_capacity(grid.len()),
        brake: Vec::with_capacity(grid.len()),
        x: Vec::with_capacity(grid.len()),
        y: Vec::with_capacity(grid.len()),
    };

    let mut idx = 1;
    for &target in grid {
        while idx < n && dist[idx] < target {
            idx += 1;
        }

        if idx >= n {
            let last = n.saturating_sub(1);
            push_point(&mut out, series, last, last, 0.0);
            continue;
        }

        let d0 = dist[idx - 1];
        let d1 = dist[idx];
        let ratio = if d1 == d0 { 0.0 } else { (target - d0) / (d1 - d0) };
        push_point(&mut out, series, idx - 1, idx, ratio);
    }

    out
}

fn push_point(out: &mut LapSeries, series: &LapSeries, i0: usize, i1: usize, ratio: f64) {
    let lerp = |values: &[f64]| values[i0] + ratio * (values[i1] - values[i0]);
    out.time.push(lerp(&series.time));
    out.speed.push(lerp(&series.speed));
    out.throttle.push(lerp(&series.throttle));
    out.brake.push(lerp(&series.brake));
    out.x.push(lerp(&series.x));
    out.y.push(lerp(&series.y));
}
