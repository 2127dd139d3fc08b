//! Side-by-side field comparison.
//!
//! Pure projections over the result store: no side effects and no
//! caching beyond the store itself. A field without cached data is an
//! explicit "no data" entry, never a zeroed summary, since zero is a
//! valid score.

use crate::models::{RiskLevel, StressSummary};
use crate::session::ResultStore;

/// One column of the comparison view.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldComparison {
    /// Field the column is for.
    pub field_id: String,
    /// Current summary, or `None` when the field was never analyzed.
    pub summary: Option<StressSummary>,
}

impl FieldComparison {
    /// Whether this field has analysis data to show.
    #[allow(dead_code)] // Utility accessor
    pub fn has_data(&self) -> bool {
        self.summary.is_some()
    }
}

/// Project the requested fields against the store, preserving the
/// input (selection) order.
pub fn compare(store: &ResultStore, field_ids: &[String]) -> Vec<FieldComparison> {
    field_ids
        .iter()
        .map(|field_id| FieldComparison {
            field_id: field_id.clone(),
            summary: store.get(field_id).map(|r| r.summary.clone()),
        })
        .collect()
}

/// Stat rows shown per field in the comparison panel: label plus the
/// value for each compared field (`None` where data is missing).
pub fn comparison_rows(comparisons: &[FieldComparison]) -> Vec<(&'static str, Vec<Option<f64>>)> {
    let pick = |f: fn(&StressSummary) -> f64| -> Vec<Option<f64>> {
        comparisons
            .iter()
            .map(|c| c.summary.as_ref().map(f))
            .collect()
    };

    vec![
        ("NDVI Health", pick(|s| s.health_score)),
        ("NDVI Stress", pick(|s| s.ndvi_stress)),
        ("Thermal Stress", pick(|s| s.thermal_stress)),
        ("Moisture Stress", pick(|s| s.moisture_stress)),
        ("Combined Stress", pick(|s| s.combined_stress)),
        ("Mean Temp (°C)", pick(|s| s.mean_temperature_c)),
    ]
}

/// Highest forecast risk across the compared fields, if any field has
/// a cached prediction.
pub fn highest_risk(store: &ResultStore, field_ids: &[String]) -> Option<RiskLevel> {
    field_ids
        .iter()
        .filter_map(|id| store.get(id))
        .filter_map(|r| r.prediction.as_ref())
        .map(|p| p.risk_level)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_summary, FieldAnalysisResult, Prediction};

    fn result(combined: f64, risk: Option<RiskLevel>) -> FieldAnalysisResult {
        FieldAnalysisResult {
            summary: sample_summary(combined),
            prediction: risk.map(|risk_level| Prediction {
                predicted_stress_next_7_days: combined + 5.0,
                risk_level,
            }),
            stress_matrix: None,
            timeseries: Vec::new(),
            heatmap: None,
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_data_is_marked_not_zeroed() {
        let mut store = ResultStore::new();
        store.upsert("a", result(22.0, None));

        let comparisons = compare(&store, &ids(&["a", "b"]));

        assert_eq!(comparisons.len(), 2);
        assert!(comparisons[0].has_data());
        assert_eq!(
            comparisons[0].summary.as_ref().unwrap().combined_stress,
            22.0
        );
        // "b" was never analyzed: explicitly no data, not a zero score.
        assert!(!comparisons[1].has_data());
        assert_eq!(comparisons[1].summary, None);
    }

    #[test]
    fn test_output_preserves_selection_order() {
        let mut store = ResultStore::new();
        store.upsert("a", result(10.0, None));
        store.upsert("b", result(20.0, None));
        store.upsert("c", result(30.0, None));

        let comparisons = compare(&store, &ids(&["c", "a", "b"]));
        let order: Vec<&str> = comparisons.iter().map(|c| c.field_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_compare_is_pure() {
        let mut store = ResultStore::new();
        store.upsert("a", result(10.0, None));

        let selection = ids(&["a"]);
        let first = compare(&store, &selection);
        let second = compare(&store, &selection);
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_comparison_rows_keep_gaps() {
        let mut store = ResultStore::new();
        store.upsert("a", result(22.0, None));

        let comparisons = compare(&store, &ids(&["a", "b"]));
        let rows = comparison_rows(&comparisons);

        let combined = rows
            .iter()
            .find(|(label, _)| *label == "Combined Stress")
            .unwrap();
        assert_eq!(combined.1, vec![Some(22.0), None]);
    }

    #[test]
    fn test_highest_risk_across_selection() {
        let mut store = ResultStore::new();
        store.upsert("a", result(10.0, Some(RiskLevel::Low)));
        store.upsert("b", result(50.0, Some(RiskLevel::High)));
        store.upsert("c", result(30.0, None));

        assert_eq!(
            highest_risk(&store, &ids(&["a", "b", "c"])),
            Some(RiskLevel::High)
        );
        assert_eq!(highest_risk(&store, &ids(&["c"])), None);
        assert_eq!(highest_risk(&store, &ids(&["missing"])), None);
    }
}
