//! HTTP client for the remote analysis service.
//!
//! Posts field geometry to the `/analyze` endpoint and decodes the
//! stress payload. Transport, status and decode failures are kept
//! distinct so the orchestrator can surface them without guessing.

use crate::service::{AnalysisPayload, AnalysisRequest, AnalysisService, ServiceError};
use std::time::Duration;
use tracing::{debug, info};

/// Analysis service reached over HTTP.
pub struct HttpAnalysisService {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisService {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        let base_url = base_url.into();
        info!("Analysis service endpoint: {}", base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url,
        }
    }

    fn analyze_url(&self) -> String {
        format!("{}/analyze", self.base_url.trim_end_matches('/'))
    }
}

impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisPayload, ServiceError> {
        let url = self.analyze_url();
        debug!(
            "POST {} ({} vertices)",
            url,
            request.polygon.coordinates.first().map_or(0, Vec::len)
        );

        let response = self.http_client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        // Decode from text so a malformed body is a Decode error, not
        // a transport error.
        let body = response.text().await?;
        let payload: AnalysisPayload = serde_json::from_str(&body)?;

        Ok(payload)
    }
}
