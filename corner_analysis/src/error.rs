use thiserror::Error;

/// Reasons an analysis produced no corners.
///
/// `analyze_lap` folds every variant into an empty report; callers that
/// want to reject bad thresholds check `AnalysisConfig::validate` first.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("reference lap has fewer than 2 samples with position and timestamp")]
    InsufficientData,

    #[error("comparison lap was requested but its series could not be built")]
    MissingComparisonSeries,

    #[error("invalid configuration: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },
}
