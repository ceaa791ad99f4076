//! Read-only access to ingested sessions, laps and telemetry.

use anyhow::{Context, Result};
use corner_analysis::laps::LapRecord;
use corner_analysis::Sample;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: i64,
    pub season: i32,
    pub round: i32,
    pub session_type: String,
    pub circuit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRow {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverSummary {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapEntry {
    pub session_id: i64,
    pub driver_id: i64,
    #[serde(flatten)]
    pub record: LapRecord,
}

/// One stored telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub session_id: i64,
    pub driver_id: i64,
    pub lap_number: u32,
    /// Seconds since the Unix epoch
    pub ts: f64,
    pub speed_kph: Option<f64>,
    pub throttle_pct: Option<f64>,
    pub brake_pct: Option<f64>,
    pub gear: Option<i32>,
    pub rpm: Option<i32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl TelemetryEntry {
    pub fn sample(&self) -> Sample {
        Sample {
            ts: Some(self.ts),
            speed: self.speed_kph,
            throttle: self.throttle_pct,
            brake: self.brake_pct,
            x: self.x,
            y: self.y,
        }
    }
}

/// Telemetry row as served by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryPoint {
    pub ts: f64,
    pub lap: u32,
    pub speed: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub gear: Option<i32>,
    pub rpm: Option<i32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl From<&TelemetryEntry> for TelemetryPoint {
    fn from(e: &TelemetryEntry) -> Self {
        Self {
            ts: e.ts,
            lap: e.lap_number,
            speed: e.speed_kph,
            throttle: e.throttle_pct,
            brake: e.brake_pct,
            gear: e.gear,
            rpm: e.rpm,
            x: e.x,
            y: e.y,
        }
    }
}

/// Queries the analysis endpoints need from storage.
pub trait TelemetryStore: Send + Sync {
    /// Sessions ordered by season, round and session type.
    fn sessions(&self) -> Vec<SessionRow>;

    fn driver_id(&self, code: &str) -> Option<i64>;

    /// Drivers with at least one lap in the session, ordered by code.
    fn session_drivers(&self, session_id: i64) -> Vec<DriverSummary>;

    /// Laps of one driver ordered by lap number.
    fn laps(&self, session_id: i64, driver_id: i64) -> Vec<LapRecord>;

    /// Telemetry ordered by timestamp, either for one lap or the first
    /// `limit` samples of the session.
    fn telemetry(
        &self,
        session_id: i64,
        driver_id: i64,
        lap: Option<u32>,
        limit: Option<usize>,
    ) -> Vec<TelemetryEntry>;

    fn lap_samples(&self, session_id: i64, driver_id: i64, lap: u32) -> Vec<Sample> {
        self.telemetry(session_id, driver_id, Some(lap), None)
            .iter()
            .map(TelemetryEntry::sample)
            .collect()
    }
}

/// Serialized contents of a [`JsonStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub sessions: Vec<SessionRow>,
    #[serde(default)]
    pub drivers: Vec<DriverRow>,
    #[serde(default)]
    pub laps: Vec<LapEntry>,
    #[serde(default)]
    pub telemetry: Vec<TelemetryEntry>,
}

/// In-memory store loaded from a JSON dataset file.
pub struct JsonStore {
    data: Dataset,
}

impl JsonStore {
    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset at {}", path.display()))?;
        let data: Dataset = serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse dataset {}", path.display()))?;
        Ok(Self::new(data))
    }

    pub fn new(mut data: Dataset) -> Self {
        data.sessions.sort_by(|a, b| {
            (a.season, a.round, &a.session_type).cmp(&(b.season, b.round, &b.session_type))
        });
        data.laps.sort_by_key(|l| (l.session_id, l.driver_id, l.record.lap_number));
        data.telemetry.sort_by(|a, b| a.ts.total_cmp(&b.ts));
        Self { data }
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.data.sessions.len(),
            self.data.drivers.len(),
            self.data.laps.len(),
            self.data.telemetry.len(),
        )
    }
}

impl TelemetryStore for JsonStore {
    fn sessions(&self) -> Vec<SessionRow> {
        self.data.sessions.clone()
    }

    fn driver_id(&self, code: &str) -> Option<i64> {
        self.data.drivers.iter().find(|d| d.code == code).map(|d| d.id)
    }

    fn session_drivers(&self, session_id: i64) -> Vec<DriverSummary> {
        let mut drivers: Vec<DriverSummary> = self
            .data
            .drivers
            .iter()
            .filter(|d| {
                self.data
                    .laps
                    .iter()
                    .any(|l| l.session_id == session_id && l.driver_id == d.id)
            })
            .map(|d| DriverSummary {
                code: d.code.clone(),
                name: d.name.clone(),
            })
            .collect();
        drivers.sort_by(|a, b| a.code.cmp(&b.code));
        drivers.dedup_by(|a, b| a.code == b.code);
        drivers
    }

    fn laps(&self, session_id: i64, driver_id: i64) -> Vec<LapRecord> {
        self.data
            .laps
            .iter()
            .filter(|l| l.session_id == session_id && l.driver_id == driver_id)
            .map(|l| l.record.clone())
            .collect()
    }

    fn telemetry(
        &self,
        session_id: i64,
        driver_id: i64,
        lap: Option<u32>,
        limit: Option<usize>,
    ) -> Vec<TelemetryEntry> {
        self.data
            .telemetry
            .iter()
            .filter(|t| t.session_id == session_id && t.driver_id == driver_id)
            .filter(|t| lap.map_or(true, |n| t.lap_number == n))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture() -> JsonStore {
        let json = serde_json::json!({
            "sessions": [
                { "id": 2, "season": 2023, "round": 2, "session_type": "R", "circuit": "Jeddah" },
                { "id": 1, "season": 2023, "round": 1, "session_type": "R", "circuit": "Sakhir" }
            ],
            "drivers": [
                { "id": 1, "code": "VER", "name": "Max Verstappen" },
                { "id": 2, "code": "ALO", "name": "Fernando Alonso" },
                { "id": 3, "code": "SAR", "name": "Logan Sargeant" }
            ],
            "laps": [
                { "session_id": 1, "driver_id": 1, "lap_number": 2, "lap_time_ms": 96000,
                  "sector_1_ms": 31000, "sector_2_ms": 33000, "sector_3_ms": 32000,
                  "compound": "SOFT", "is_pit": false },
                { "session_id": 1, "driver_id": 1, "lap_number": 1, "lap_time_ms": 99000,
                  "sector_1_ms": null, "sector_2_ms": null, "sector_3_ms": null,
                  "compound": "SOFT", "is_pit": false },
                { "session_id": 1, "driver_id": 2, "lap_number": 1, "lap_time_ms": 98000,
                  "sector_1_ms": null, "sector_2_ms": null, "sector_3_ms": null,
                  "compound": null, "is_pit": true }
            ],
            "telemetry": []
        });
        let mut data: Dataset = serde_json::from_value(json).unwrap();

        for lap in 1..=2u32 {
            let base = 1_000.0 * lap as f64;
            for i in (0..200).rev() {
                let braking = (100..104).contains(&i);
                data.telemetry.push(TelemetryEntry {
                    session_id: 1,
                    driver_id: 1,
                    lap_number: lap,
                    ts: base + i as f64 * 0.05 + if lap == 2 && i >= 100 { 0.3 } else { 0.0 },
                    speed_kph: Some(200.0),
                    throttle_pct: Some(if braking { 0.0 } else { 100.0 }),
                    brake_pct: Some(if braking { 20.0 } else { 0.0 }),
                    gear: Some(6),
                    rpm: Some(11_000),
                    x: Some(i as f64 * 5.0),
                    y: Some(0.0),
                });
            }
        }
        JsonStore::new(data)
    }

    #[test]
    fn test_sessions_ordered() {
        let ids: Vec<i64> = fixture().sessions().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_driver_lookup() {
        let store = fixture();
        assert_eq!(store.driver_id("ALO"), Some(2));
        assert_eq!(store.driver_id("XXX"), None);
    }

    #[test]
    fn test_session_drivers_only_with_laps() {
        let codes: Vec<String> = fixture()
            .session_drivers(1)
            .into_iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(codes, vec!["ALO", "VER"]);
    }

    #[test]
    fn test_laps_ordered_by_number() {
        let laps: Vec<u32> = fixture().laps(1, 1).iter().map(|l| l.lap_number).collect();
        assert_eq!(laps, vec![1, 2]);
    }

    #[test]
    fn test_telemetry_sorted_and_limited() {
        let store = fixture();
        let lap = store.telemetry(1, 1, Some(2), None);
        assert_eq!(lap.len(), 200);
        assert!(lap.windows(2).all(|w| w[0].ts <= w[1].ts));
        assert!(lap.iter().all(|t| t.lap_number == 2));

        let first = store.telemetry(1, 1, None, Some(10));
        assert_eq!(first.len(), 10);
        assert!(first.iter().all(|t| t.lap_number == 1));

        assert_eq!(store.lap_samples(1, 1, 1).len(), 200);
        assert!(store.lap_samples(1, 2, 1).is_empty());
    }
}
