use axum::{
    extract::{Query, State},
    http::HeaderValue,
    routing::get,
    Json, Router,
};
use corner_analysis::laps::{
    aggregate_telemetry, mark_best_laps, summarize_laps, LapRow, LapSummary, LapTelemetryStats,
};
use corner_analysis::{try_analyze_lap, AnalysisConfig, AnalysisError, CornerReport};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::store::{DriverSummary, SessionRow, TelemetryPoint, TelemetryStore};

pub const DEFAULT_TELEMETRY_LIMIT: usize = 5_000;
pub const MAX_TELEMETRY_LIMIT: usize = 50_000;

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", get(sessions))
        .route("/drivers", get(drivers))
        .route("/laps", get(laps))
        .route("/laps/summary", get(laps_summary))
        .route("/laps/corners", get(lap_corners))
        .route("/telemetry", get(telemetry))
        .route("/lap_summaries", get(lap_summaries))
        .layer(cors())
        .with_state(state)
}

/// Cross-origin access for the local dashboard dev server.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods(Any)
        .allow_headers(Any)
}

// ---------- Query types ----------

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DriverQuery {
    pub session_id: i64,
    pub driver_code: String,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    pub session_id: i64,
    pub driver_code: String,
    pub lap_number: Option<u32>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_TELEMETRY_LIMIT
}

/// Corner analysis request. Threshold names follow the public API; any
/// omitted threshold takes the [`AnalysisConfig`] default.
#[derive(Debug, Deserialize)]
pub struct CornerQuery {
    pub session_id: i64,
    pub driver_code: String,
    pub reference_lap: u32,
    pub compare_lap: Option<u32>,
    pub step: Option<f64>,
    pub on: Option<f64>,
    pub off: Option<f64>,
    pub exit_thr: Option<f64>,
    pub min_len: Option<f64>,
    pub min_drop_kph: Option<f64>,
    pub min_time: Option<f64>,
    pub min_peak_brake: Option<f64>,
    #[serde(default)]
    pub scale01: bool,
}

impl CornerQuery {
    pub fn config(&self) -> AnalysisConfig {
        let d = AnalysisConfig::default();
        AnalysisConfig {
            resample_step: self.step.unwrap_or(d.resample_step),
            brake_on: self.on.unwrap_or(d.brake_on),
            brake_off: self.off.unwrap_or(d.brake_off),
            throttle_exit: self.exit_thr.unwrap_or(d.throttle_exit),
            min_distance: self.min_len.unwrap_or(d.min_distance),
            min_drop: self.min_drop_kph.unwrap_or(d.min_drop),
            min_time: self.min_time.unwrap_or(d.min_time),
            min_peak_brake: self.min_peak_brake.unwrap_or(d.min_peak_brake),
            scale01: self.scale01,
            policy: d.policy,
        }
    }
}

// ---------- Handlers ----------

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn sessions(State(state): State<AppState>) -> Json<Vec<SessionRow>> {
    Json(state.store.sessions())
}

pub async fn drivers(
    State(state): State<AppState>,
    Query(q): Query<SessionQuery>,
) -> Json<Vec<DriverSummary>> {
    Json(state.store.session_drivers(q.session_id))
}

pub async fn laps(State(state): State<AppState>, Query(q): Query<DriverQuery>) -> Json<Vec<LapRow>> {
    let Some(driver_id) = state.store.driver_id(&q.driver_code) else {
        return Json(Vec::new());
    };
    Json(mark_best_laps(&state.store.laps(q.session_id, driver_id)))
}

pub async fn laps_summary(
    State(state): State<AppState>,
    Query(q): Query<DriverQuery>,
) -> Json<Vec<LapSummary>> {
    let Some(driver_id) = state.store.driver_id(&q.driver_code) else {
        return Json(Vec::new());
    };
    Json(summarize_laps(&state.store.laps(q.session_id, driver_id)))
}

pub async fn telemetry(
    State(state): State<AppState>,
    Query(q): Query<TelemetryQuery>,
) -> Result<Json<Vec<TelemetryPoint>>, ApiError> {
    if q.limit > MAX_TELEMETRY_LIMIT {
        return Err(ApiError::LimitTooLarge {
            limit: q.limit,
            max: MAX_TELEMETRY_LIMIT,
        });
    }
    let Some(driver_id) = state.store.driver_id(&q.driver_code) else {
        return Ok(Json(Vec::new()));
    };

    // a whole lap is always returned; the limit only caps session-wide reads
    let limit = q.lap_number.is_none().then_some(q.limit);
    let rows = state
        .store
        .telemetry(q.session_id, driver_id, q.lap_number, limit);
    Ok(Json(rows.iter().map(TelemetryPoint::from).collect()))
}

pub async fn lap_summaries(
    State(state): State<AppState>,
    Query(q): Query<DriverQuery>,
) -> Json<Vec<LapTelemetryStats>> {
    let Some(driver_id) = state.store.driver_id(&q.driver_code) else {
        return Json(Vec::new());
    };
    let rows = state.store.telemetry(q.session_id, driver_id, None, None);
    let samples: Vec<_> = rows.iter().map(|t| (t.lap_number, t.sample())).collect();
    Json(aggregate_telemetry(samples.iter().map(|(lap, s)| (*lap, s))))
}

pub async fn lap_corners(
    State(state): State<AppState>,
    Query(q): Query<CornerQuery>,
) -> Result<Json<CornerReport>, ApiError> {
    let config = q.config();
    config.validate()?;

    let Some(driver_id) = state.store.driver_id(&q.driver_code) else {
        tracing::debug!(driver = %q.driver_code, "unknown driver; empty corner report");
        return Ok(Json(CornerReport::default()));
    };

    let reference = state
        .store
        .lap_samples(q.session_id, driver_id, q.reference_lap);
    let comparison = q
        .compare_lap
        .map(|lap| state.store.lap_samples(q.session_id, driver_id, lap));

    // bad thresholds are the caller's fault; missing data is an empty report
    let report = match try_analyze_lap(&reference, comparison.as_deref(), &config) {
        Ok(report) => report,
        Err(e @ AnalysisError::InvalidConfig { .. }) => return Err(e.into()),
        Err(e) => {
            tracing::debug!(error = %e, "corner analysis degraded to empty report");
            CornerReport::default()
        }
    };
    tracing::info!(
        session_id = q.session_id,
        driver = %q.driver_code,
        reference_lap = q.reference_lap,
        compare_lap = ?q.compare_lap,
        samples = reference.len(),
        corners = report.corners.len(),
        losses = report.top_losses.len(),
        "corner analysis"
    );
    Ok(Json(report))
}
