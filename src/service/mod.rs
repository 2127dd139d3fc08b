//! Remote analysis service interface.
//!
//! The dashboard core treats the analysis backend as an opaque remote
//! call: field geometry in, stress payload out. The [`AnalysisService`]
//! trait is the seam; the HTTP implementation lives in [`client`] and
//! tests substitute in-memory mocks.

pub mod client;

pub use client::HttpAnalysisService;

use crate::models::{
    AnalysisType, FieldAnalysisResult, Geometry, Heatmap, Prediction, RiskLevel, StressSummary,
    TimeSeriesPoint,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from the external analysis call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure (connection, timeout).
    #[error("analysis service request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("analysis service returned HTTP {0}")]
    Status(u16),

    /// The service answered but the payload did not parse.
    #[error("malformed analysis payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// GeoJSON-style polygon as the service expects it.
#[derive(Debug, Clone, Serialize)]
pub struct GeoJsonPolygon {
    #[serde(rename = "type")]
    pub kind: String,
    /// Rings; only the exterior ring is sent.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl From<&Geometry> for GeoJsonPolygon {
    fn from(geometry: &Geometry) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![geometry.ring.clone()],
        }
    }
}

/// Request body for one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub polygon: GeoJsonPolygon,
    pub analysis_type: AnalysisType,
}

impl AnalysisRequest {
    /// Build a request from a field geometry and the selected model type.
    pub fn new(geometry: &Geometry, analysis_type: AnalysisType) -> Self {
        Self {
            polygon: geometry.into(),
            analysis_type,
        }
    }
}

/// Forecast as it appears on the wire. The risk level arrives as a free
/// string and is normalized on conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePrediction {
    pub predicted_stress_next_7_days: f64,
    #[serde(default)]
    pub risk_level: String,
}

impl From<WirePrediction> for Prediction {
    fn from(wire: WirePrediction) -> Self {
        Prediction {
            predicted_stress_next_7_days: wire.predicted_stress_next_7_days,
            risk_level: RiskLevel::from(wire.risk_level.as_str()),
        }
    }
}

/// The full analysis payload returned by the service.
///
/// Every member except the summary is optional on the wire and defaults
/// to empty/absent rather than failing the decode.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisPayload {
    pub summary: StressSummary,
    #[serde(default)]
    pub prediction: Option<WirePrediction>,
    #[serde(default)]
    pub stress_matrix: Option<Value>,
    #[serde(default)]
    pub timeseries: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub heatmap: Option<Heatmap>,
}

impl AnalysisPayload {
    /// Convert the wire payload into the stored result shape.
    ///
    /// The timeseries is sorted date-ascending here: the service is
    /// expected to emit sorted points, but unsorted input is tolerated.
    pub fn into_result(self) -> FieldAnalysisResult {
        let mut timeseries = self.timeseries;
        timeseries.sort_by(|a, b| a.date.cmp(&b.date));

        FieldAnalysisResult {
            summary: self.summary,
            prediction: self.prediction.map(Prediction::from),
            stress_matrix: self.stress_matrix,
            timeseries,
            heatmap: self.heatmap,
        }
    }
}

/// The seam between the session core and the analysis backend.
pub trait AnalysisService {
    /// Run one analysis for a field geometry.
    fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> impl std::future::Future<Output = Result<AnalysisPayload, ServiceError>> + Send;
}
