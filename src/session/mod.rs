//! Dashboard session state.
//!
//! One [`Session`] holds everything the presentation layer reads: the
//! result store, the report history, the ordered selection, overlay
//! visibility and the per-field run status. Each mutation is an
//! explicit method; there is no generic setter to spread state through.

pub mod history;
pub mod orchestrator;
pub mod store;

pub use history::ReportHistory;
pub use orchestrator::{run_analysis, run_selection, AnalysisError};
pub use store::ResultStore;

use crate::models::{AnalysisType, ReportSnapshot};
use crate::registry::FieldRegistry;
use chrono::Utc;
use std::collections::HashMap;

/// Run status for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// No analysis in flight.
    #[default]
    Idle,
    /// An analysis call is in flight for this field.
    Running,
}

/// In-memory state for one dashboard session.
#[derive(Debug, Default)]
pub struct Session {
    /// Current analysis results, keyed by field id.
    pub store: ResultStore,
    /// Newest-first log of completed runs.
    pub history: ReportHistory,
    /// Ordered set of field ids selected for analysis/comparison.
    selection: Vec<String>,
    /// Per-field run status. Fields absent from the map are idle.
    status: HashMap<String, RunStatus>,
    /// Whether the heatmap overlay is shown on the map.
    overlay_visible: bool,
    /// Selected analysis model type.
    analysis_type: AnalysisType,
}

impl Session {
    /// Create a fresh session. The overlay starts visible.
    pub fn new() -> Self {
        Self {
            overlay_visible: true,
            ..Self::default()
        }
    }

    // --- Selection ---

    /// Add a field to the selection, preserving selection order.
    /// Selecting an already-selected field is a no-op.
    pub fn select(&mut self, field_id: impl Into<String>) {
        let field_id = field_id.into();
        if !self.selection.contains(&field_id) {
            self.selection.push(field_id);
        }
    }

    /// Remove a field from the selection.
    #[allow(dead_code)] // Dashboard operation, not exposed on the CLI
    pub fn deselect(&mut self, field_id: &str) {
        self.selection.retain(|id| id != field_id);
    }

    /// Selected field ids, in selection order.
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Clear the selection.
    #[allow(dead_code)] // Dashboard operation, not exposed on the CLI
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- Run status ---

    /// Run status for a field; fields never run are idle.
    pub fn status(&self, field_id: &str) -> RunStatus {
        self.status.get(field_id).copied().unwrap_or_default()
    }

    pub(crate) fn set_status(&mut self, field_id: &str, status: RunStatus) {
        match status {
            RunStatus::Idle => {
                self.status.remove(field_id);
            }
            RunStatus::Running => {
                self.status.insert(field_id.to_string(), status);
            }
        }
    }

    // --- Overlay & analysis type ---

    /// Whether the heatmap overlay is shown.
    #[allow(dead_code)] // Read by the map layer
    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Show or hide the heatmap overlay.
    pub fn set_overlay_visible(&mut self, visible: bool) {
        self.overlay_visible = visible;
    }

    /// Flip overlay visibility.
    #[allow(dead_code)] // Dashboard operation, not exposed on the CLI
    pub fn toggle_overlay(&mut self) {
        self.overlay_visible = !self.overlay_visible;
    }

    /// Heatmap tile URL for a field, when a result with a heatmap is
    /// cached and the overlay is visible.
    #[allow(dead_code)] // Read by the map layer
    pub fn overlay_tile_url(&self, field_id: &str) -> Option<&str> {
        if !self.overlay_visible {
            return None;
        }
        self.store
            .get(field_id)
            .and_then(|r| r.heatmap.as_ref())
            .map(|h| h.tile_url.as_str())
    }

    /// Selected analysis model type.
    pub fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    /// Change the analysis model type.
    pub fn set_analysis_type(&mut self, analysis_type: AnalysisType) {
        self.analysis_type = analysis_type;
    }

    // --- Export ---

    /// Read-only snapshot of a field's current analysis for report
    /// export. `None` when the field is unknown or never analyzed.
    pub fn export_snapshot(
        &self,
        registry: &FieldRegistry,
        field_id: &str,
    ) -> Option<ReportSnapshot> {
        let field = registry.find(field_id)?;
        let result = self.store.get(field_id)?;
        Some(ReportSnapshot {
            field_id: field.id.clone(),
            field_name: field.name.clone(),
            date: Utc::now(),
            summary: result.summary.clone(),
            prediction: result.prediction.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_summary, Field, FieldAnalysisResult, Geometry, Heatmap};

    fn cached_result(tile_url: Option<&str>) -> FieldAnalysisResult {
        FieldAnalysisResult {
            summary: sample_summary(22.0),
            prediction: None,
            stress_matrix: None,
            timeseries: Vec::new(),
            heatmap: tile_url.map(|url| Heatmap {
                tile_url: url.to_string(),
            }),
        }
    }

    #[test]
    fn test_selection_is_ordered_and_deduplicated() {
        let mut session = Session::new();
        session.select("b");
        session.select("a");
        session.select("b");

        assert_eq!(session.selection(), &["b".to_string(), "a".to_string()]);

        session.deselect("b");
        assert_eq!(session.selection(), &["a".to_string()]);
    }

    #[test]
    fn test_status_defaults_to_idle() {
        let session = Session::new();
        assert_eq!(session.status("anything"), RunStatus::Idle);
    }

    #[test]
    fn test_overlay_tile_url_respects_visibility() {
        let mut session = Session::new();
        session
            .store
            .upsert("a", cached_result(Some("https://tiles/x")));

        assert!(session.overlay_visible());
        assert_eq!(session.overlay_tile_url("a"), Some("https://tiles/x"));
        assert_eq!(session.overlay_tile_url("b"), None);

        session.toggle_overlay();
        assert_eq!(session.overlay_tile_url("a"), None);

        session.set_overlay_visible(true);
        assert_eq!(session.overlay_tile_url("a"), Some("https://tiles/x"));
    }

    #[test]
    fn test_overlay_tile_url_none_without_heatmap() {
        let mut session = Session::new();
        session.store.upsert("a", cached_result(None));
        assert_eq!(session.overlay_tile_url("a"), None);
    }

    #[test]
    fn test_export_snapshot() {
        let mut registry = FieldRegistry::new();
        registry
            .add_field(Field::new(
                "north-40",
                "North Forty",
                Geometry::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]),
            ))
            .unwrap();

        let mut session = Session::new();
        assert!(session.export_snapshot(&registry, "north-40").is_none());

        session.store.upsert("north-40", cached_result(None));
        let snapshot = session.export_snapshot(&registry, "north-40").unwrap();
        assert_eq!(snapshot.field_name, "North Forty");
        assert_eq!(snapshot.summary.combined_stress, 22.0);

        assert!(session.export_snapshot(&registry, "unknown").is_none());
    }
}
