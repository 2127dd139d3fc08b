//! Data models for the crop stress dashboard core.
//!
//! This module contains the core data structures shared across the
//! session: fields, stress summaries, predictions, timeseries and
//! report entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A field polygon: one exterior ring of `[lng, lat]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Exterior ring vertices as `[lng, lat]`.
    pub ring: Vec<[f64; 2]>,
}

impl Geometry {
    /// Create a geometry from an exterior ring.
    #[allow(dead_code)] // Constructor for embedding; the CLI deserializes geometry
    pub fn new(ring: Vec<[f64; 2]>) -> Self {
        Self { ring }
    }

    /// A polygon needs at least three vertices to enclose an area.
    pub fn is_usable(&self) -> bool {
        self.ring.len() >= 3
    }
}

/// A user-drawn field available for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Unique, stable identifier.
    pub id: String,
    /// Display name; the only mutable part of a field.
    pub name: String,
    /// Field boundary polygon.
    pub geometry: Geometry,
}

impl Field {
    /// Create a new field.
    #[allow(dead_code)] // Constructor for embedding; the CLI deserializes fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            geometry,
        }
    }
}

/// Risk level for the 7-day stress forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Predicted stress below the moderate threshold.
    Low,
    /// Elevated stress expected.
    Moderate,
    /// Severe stress expected.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Moderate => write!(f, "Moderate"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

impl From<&str> for RiskLevel {
    /// Parse a wire risk level. Anything other than the two elevated
    /// levels is treated as low, not as an error.
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "high" => RiskLevel::High,
            "moderate" => RiskLevel::Moderate,
            _ => RiskLevel::Low,
        }
    }
}

/// Severity classification derived from a risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Medium,
    Severe,
}

impl RiskLevel {
    /// Map a risk level onto a display severity.
    #[allow(dead_code)] // Presentation-layer mapping
    pub fn severity(&self) -> RiskSeverity {
        match self {
            RiskLevel::High => RiskSeverity::Severe,
            RiskLevel::Moderate => RiskSeverity::Medium,
            RiskLevel::Low => RiskSeverity::Low,
        }
    }

    /// Returns an emoji representation of the risk level.
    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Moderate => "🟡",
            RiskLevel::High => "🔴",
        }
    }
}

/// Stress summary produced once per completed analysis run. Immutable.
///
/// All stress scores are percentages in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSummary {
    /// Overall vegetation health score.
    pub health_score: f64,
    /// Stress derived from the NDVI band.
    #[serde(default)]
    pub ndvi_stress: f64,
    /// Stress derived from surface temperature.
    #[serde(default)]
    pub thermal_stress: f64,
    /// Stress derived from the moisture index.
    #[serde(default)]
    pub moisture_stress: f64,
    /// Aggregate score blending NDVI/thermal/moisture stress.
    pub combined_stress: f64,
    /// Mean NDWI over the field (moisture proxy, unbounded index).
    #[serde(default)]
    pub mean_ndwi: f64,
    /// Mean surface temperature in Celsius.
    #[serde(default)]
    pub mean_temperature_c: f64,
    /// Model confidence for this run, as a percentage.
    #[serde(default)]
    pub confidence_score: f64,
    /// Dominant stress driver reported by the service.
    #[serde(default = "unknown_cause")]
    pub stress_cause: String,
}

fn unknown_cause() -> String {
    "Unknown".to_string()
}

/// Healthy/stressed split for the donut visualization.
///
/// Always sums to 100 for a valid combined stress score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressFraction {
    pub healthy: f64,
    pub stressed: f64,
}

impl StressSummary {
    /// Compute the healthy/stressed split from the combined stress score.
    ///
    /// Recomputed fresh on every read so it can never go stale against
    /// `combined_stress` after a re-run.
    pub fn stress_fraction(&self) -> StressFraction {
        StressFraction {
            healthy: 100.0 - self.combined_stress,
            stressed: self.combined_stress,
        }
    }
}

/// 7-day stress forecast. Absent when the service returns no forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted combined stress over the next 7 days.
    pub predicted_stress_next_7_days: f64,
    /// Forecast risk band.
    pub risk_level: RiskLevel,
}

/// One point of the NDVI trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// ISO date string (`YYYY-MM-DD`).
    pub date: String,
    /// NDVI value in `[0, 1]`.
    pub value: f64,
}

/// Ordered NDVI trend, date ascending. Replaced wholesale per run.
pub type TimeSeries = Vec<TimeSeriesPoint>;

/// Heatmap overlay descriptor returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    /// Tile URL template for the map overlay.
    pub tile_url: String,
}

/// The current analysis result for one field.
///
/// Overwritten on each new run for that field; prior values survive
/// only through the report history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAnalysisResult {
    /// Stress summary for the run.
    pub summary: StressSummary,
    /// Optional 7-day forecast.
    pub prediction: Option<Prediction>,
    /// Opaque per-pixel stress grid underlying the heatmap.
    pub stress_matrix: Option<serde_json::Value>,
    /// NDVI trend, date ascending.
    pub timeseries: TimeSeries,
    /// Optional heatmap overlay for the map layer.
    pub heatmap: Option<Heatmap>,
}

static REPORT_SEQ: AtomicU64 = AtomicU64::new(0);

/// One completed analysis run, as recorded in the report history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Unique entry id, timestamp-derived.
    pub id: String,
    /// Field the run was for.
    pub field_id: String,
    /// Completion time of the run.
    pub date: DateTime<Utc>,
    /// Stress summary of the run.
    pub summary: StressSummary,
    /// Forecast of the run, if the service returned one.
    pub prediction: Option<Prediction>,
}

impl ReportEntry {
    /// Create a report entry for a completed run.
    ///
    /// The id combines the millisecond timestamp with a process-wide
    /// sequence number so entries created in the same millisecond stay
    /// distinct.
    pub fn new(
        field_id: impl Into<String>,
        summary: StressSummary,
        prediction: Option<Prediction>,
    ) -> Self {
        let date = Utc::now();
        let seq = REPORT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}-{}", date.timestamp_millis(), seq),
            field_id: field_id.into(),
            date,
            summary,
            prediction,
        }
    }
}

/// Analysis model type selectable from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum AnalysisType {
    /// Water stress model only.
    Water,
    /// Nutrient stress model only.
    Nutrient,
    /// Blended model (default).
    #[default]
    Combined,
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisType::Water => write!(f, "Water"),
            AnalysisType::Nutrient => write!(f, "Nutrient"),
            AnalysisType::Combined => write!(f, "Combined"),
        }
    }
}

/// Read-only export view of one field's current analysis, sufficient
/// to render a fixed-format report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub field_id: String,
    pub field_name: String,
    pub date: DateTime<Utc>,
    pub summary: StressSummary,
    pub prediction: Option<Prediction>,
}

#[cfg(test)]
pub(crate) fn sample_summary(combined_stress: f64) -> StressSummary {
    StressSummary {
        health_score: 100.0 - combined_stress,
        ndvi_stress: combined_stress,
        thermal_stress: 0.0,
        moisture_stress: 0.0,
        combined_stress,
        mean_ndwi: 0.15,
        mean_temperature_c: 24.5,
        confidence_score: 90.0,
        stress_cause: "NDVI".to_string(),
    }
}
