//! Corner detection and lap-to-lap time loss analysis for racing telemetry.
//!
//! A lap arrives as an irregular, time-indexed stream of samples. The pipeline
//! turns it into a distance-indexed series, resamples it onto a uniform grid,
//! smooths the driver inputs, segments braking zones into corners and ranks the
//! corners where a comparison lap lost the most time.
//!
//! ```
//! use corner_analysis::{analyze_lap, AnalysisConfig, Sample};
//!
//! let samples: Vec<Sample> = Vec::new();
//! let report = analyze_lap(&samples, None, &AnalysisConfig::default());
//! assert!(report.corners.is_empty());
//! ```

pub mod analysis;
pub mod corners;
pub mod error;
pub mod laps;
pub mod losses;
pub mod resample;
pub mod segment;
pub mod select;
pub mod series;
pub mod smooth;

pub use analysis::{
    analyze_lap, try_analyze_lap, AnalysisConfig, CascadePolicy, CornerReport, DetectionPolicy,
    Thresholds,
};
pub use corners::Corner;
pub use error::AnalysisError;
pub use losses::CornerLoss;
pub use series::{build_series, LapSeries, Sample};
