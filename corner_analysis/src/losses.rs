use serde::{Deserialize, Serialize};

use crate::corners::Corner;

/// Number of corners reported as top losses.
pub const TOP_LOSSES: usize = 3;

/// A corner where the comparison lap was slower than the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerLoss {
    pub corner: u32,
    pub delta_s: f64,
}

/// The largest positive per-corner deltas, biggest first.
pub fn top_losses(corners: &[Corner]) -> Vec<CornerLoss> {
    let mut losses: Vec<CornerLoss> = corners
        .iter()
        .filter_map(|c| match c.delta_s {
            Some(delta_s) if delta_s > 0.0 => Some(CornerLoss {
                corner: c.corner,
                delta_s,
            }),
            _ => None,
        })
        .collect();

    losses.sort_by(|a, b| b.delta_s.total_cmp(&a.delta_s));
    losses.truncate(TOP_LOSSES);
    losses
}
