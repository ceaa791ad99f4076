//! Lap-table summaries: best lap, in/out laps and sector deltas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::series::Sample;

/// One timed lap as stored. Times are milliseconds; zero means "not timed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    pub lap_time_ms: Option<i64>,
    pub sector_1_ms: Option<i64>,
    pub sector_2_ms: Option<i64>,
    pub sector_3_ms: Option<i64>,
    pub compound: Option<String>,
    #[serde(default)]
    pub is_pit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRow {
    pub lap: u32,
    pub lap_ms: Option<i64>,
    pub s1: Option<i64>,
    pub s2: Option<i64>,
    pub s3: Option<i64>,
    pub compound: Option<String>,
    pub is_pit: bool,
    pub is_best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapSummary {
    pub lap: u32,
    pub lap_ms: Option<i64>,
    pub s1: Option<i64>,
    pub s2: Option<i64>,
    pub s3: Option<i64>,
    pub compound: Option<String>,
    pub is_pit: bool,
    pub is_out: bool,
    pub is_in: bool,
    pub delta_ms: Option<f64>,
    pub delta_s1: Option<f64>,
    pub delta_s2: Option<f64>,
    pub delta_s3: Option<f64>,
    pub has_valid: bool,
}

/// Per-lap aggregates of the raw telemetry channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapTelemetryStats {
    pub lap: u32,
    pub n: usize,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub avg_throttle: Option<f64>,
    pub avg_brake: Option<f64>,
}

fn timed(ms: Option<i64>) -> Option<i64> {
    ms.filter(|&v| v != 0)
}

/// Flag the fastest non-pit lap (ties all flagged).
pub fn mark_best_laps(laps: &[LapRecord]) -> Vec<LapRow> {
    let best = laps
        .iter()
        .filter(|l| !l.is_pit)
        .filter_map(|l| l.lap_time_ms.filter(|&ms| ms > 0))
        .min();

    laps.iter()
        .map(|l| LapRow {
            lap: l.lap_number,
            lap_ms: l.lap_time_ms,
            s1: l.sector_1_ms,
            s2: l.sector_2_ms,
            s3: l.sector_3_ms,
            compound: l.compound.clone(),
            is_pit: l.is_pit,
            is_best: best.is_some() && !l.is_pit && l.lap_time_ms == best,
        })
        .collect()
}

/// Summaries with in/out-lap flags and deltas to the best clean lap and
/// sectors.
///
/// A pit lap is an in-lap and makes the following lap an out-lap; neither
/// contributes to the bests.
pub fn summarize_laps(laps: &[LapRecord]) -> Vec<LapSummary> {
    let mut is_out = vec![false; laps.len()];
    for (idx, lap) in laps.iter().enumerate() {
        if lap.is_pit {
            if let Some(next) = is_out.get_mut(idx + 1) {
                *next = true;
            }
        }
    }

    let clean = |idx: usize| !laps[idx].is_pit && !is_out[idx];
    let best_of = |get: fn(&LapRecord) -> Option<i64>| {
        laps.iter()
            .enumerate()
            .filter(|(idx, _)| clean(*idx))
            .filter_map(|(_, l)| timed(get(l)))
            .min()
    };
    let best_lap = best_of(|l| l.lap_time_ms);
    let best_s1 = best_of(|l| l.sector_1_ms);
    let best_s2 = best_of(|l| l.sector_2_ms);
    let best_s3 = best_of(|l| l.sector_3_ms);

    let delta = |value: Option<i64>, base: Option<i64>| match (timed(value), base) {
        (Some(v), Some(b)) => Some((v - b) as f64),
        _ => None,
    };

    laps.iter()
        .enumerate()
        .map(|(idx, l)| LapSummary {
            lap: l.lap_number,
            lap_ms: l.lap_time_ms,
            s1: l.sector_1_ms,
            s2: l.sector_2_ms,
            s3: l.sector_3_ms,
            compound: l.compound.clone(),
            is_pit: l.is_pit,
            is_out: is_out[idx],
            is_in: l.is_pit,
            delta_ms: delta(l.lap_time_ms, best_lap),
            delta_s1: delta(l.sector_1_ms, best_s1),
            delta_s2: delta(l.sector_2_ms, best_s2),
            delta_s3: delta(l.sector_3_ms, best_s3),
            has_valid: l.lap_time_ms.is_some_and(|ms| ms > 0) && !l.is_pit,
        })
        .collect()
}

/// Aggregate samples by lap number, ascending. Missing channel values are
/// ignored; a channel with no values at all aggregates to `None`.
pub fn aggregate_telemetry<'a>(
    rows: impl IntoIterator<Item = (u32, &'a Sample)>,
) -> Vec<LapTelemetryStats> {
    #[derive(Default)]
    struct Acc {
        n: usize,
        speed: Mean,
        max_speed: Option<f64>,
        throttle: Mean,
        brake: Mean,
    }

    let mut by_lap: BTreeMap<u32, Acc> = BTreeMap::new();
    for (lap, s) in rows {
        let acc = by_lap.entry(lap).or_default();
        acc.n += 1;
        acc.speed.add(s.speed);
        acc.throttle.add(s.throttle);
        acc.brake.add(s.brake);
        if let Some(v) = s.speed {
            acc.max_speed = Some(acc.max_speed.map_or(v, |m| m.max(v)));
        }
    }

    by_lap
        .into_iter()
        .map(|(lap, acc)| LapTelemetryStats {
            lap,
            n: acc.n,
            avg_speed: acc.speed.value(),
            max_speed: acc.max_speed,
            avg_throttle: acc.throttle.value(),
            avg_brake: acc.brake.value(),
        })
        .collect()
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, v: Option<f64>) {
        if let Some(v) = v {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}
