use crate::corners::Corner;

/// Upper bound on corners reported for one lap.
pub const DEFAULT_MAX_CORNERS: usize = 22;

/// Ranking score: speed shed through the corner plus half the peak brake.
pub fn score(corner: &Corner) -> f64 {
    corner.speed_drop() + 0.5 * corner.brake_peak
}

/// Keep the `max_corners` highest-scoring corners, then order them along the
/// lap and number them from 1.
pub fn select_corners(mut corners: Vec<Corner>, max_corners: usize) -> Vec<Corner> {
    corners.sort_by(|a, b| a.distance_start.total_cmp(&b.distance_start));
    corners.sort_by(|a, b| score(b).total_cmp(&score(a)));
    corners.truncate(max_corners);
    corners.sort_by(|a, b| a.distance_start.total_cmp(&b.distance_start));
    renumber(&mut corners);
    corners
}

fn renumber(corners: &mut [Corner]) {
    for (idx, corner) in corners.iter_mut().enumerate() {
        corner.corner = idx as u32 + 1;
    }
}
