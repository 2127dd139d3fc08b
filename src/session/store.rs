//! Analysis result store.
//!
//! Keyed mapping from field id to its latest analysis result. The one
//! rule that matters here: inserting a result for field X must never
//! remove or alter the entry for any other field.

use crate::models::FieldAnalysisResult;
use std::collections::HashMap;
use tracing::debug;

/// Current analysis results, keyed by field id.
#[derive(Debug, Default)]
pub struct ResultStore {
    results: HashMap<String, FieldAnalysisResult>,
}

impl ResultStore {
    /// Create an empty store.
    #[allow(dead_code)] // Constructor for embedding; Session builds via Default
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyed upsert: replace the entry for this field only.
    ///
    /// Previous results for the field are dropped (history keeps them);
    /// entries for every other field are untouched.
    pub fn upsert(&mut self, field_id: impl Into<String>, result: FieldAnalysisResult) {
        let field_id = field_id.into();
        debug!(
            "Storing result for field '{}' (combined stress {:.1})",
            field_id, result.summary.combined_stress
        );
        self.results.insert(field_id, result);
    }

    /// Current result for a field, if one has been analyzed.
    pub fn get(&self, field_id: &str) -> Option<&FieldAnalysisResult> {
        self.results.get(field_id)
    }

    /// Whether a field has a cached result.
    #[allow(dead_code)] // Utility accessor
    pub fn contains(&self, field_id: &str) -> bool {
        self.results.contains_key(field_id)
    }

    /// Number of fields with cached results.
    #[allow(dead_code)] // Utility accessor
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no field has been analyzed yet.
    #[allow(dead_code)] // Utility accessor
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All cached results. Iteration order is unspecified; callers that
    /// need a stable order key off the registry or selection.
    #[allow(dead_code)] // Utility for presentation-layer iteration
    pub fn results(&self) -> impl Iterator<Item = (&String, &FieldAnalysisResult)> {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_summary;

    fn result(combined: f64) -> FieldAnalysisResult {
        FieldAnalysisResult {
            summary: sample_summary(combined),
            prediction: None,
            stress_matrix: None,
            timeseries: Vec::new(),
            heatmap: None,
        }
    }

    #[test]
    fn test_upsert_does_not_touch_other_fields() {
        let mut store = ResultStore::new();
        store.upsert("a", result(10.0));
        let a_before = store.get("a").cloned().unwrap();

        store.upsert("b", result(20.0));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(&a_before));
        assert_eq!(store.get("b").unwrap().summary.combined_stress, 20.0);
    }

    #[test]
    fn test_merge_order_is_commutative() {
        let mut forward = ResultStore::new();
        forward.upsert("a", result(10.0));
        forward.upsert("b", result(20.0));

        let mut reverse = ResultStore::new();
        reverse.upsert("b", result(20.0));
        reverse.upsert("a", result(10.0));

        assert_eq!(forward.get("a"), reverse.get("a"));
        assert_eq!(forward.get("b"), reverse.get("b"));
        assert_eq!(forward.len(), reverse.len());
    }

    #[test]
    fn test_rerun_overwrites_only_that_field() {
        let mut store = ResultStore::new();
        store.upsert("a", result(10.0));
        store.upsert("b", result(20.0));

        store.upsert("a", result(35.0));

        assert_eq!(store.get("a").unwrap().summary.combined_stress, 35.0);
        assert_eq!(store.get("b").unwrap().summary.combined_stress, 20.0);
    }

    #[test]
    fn test_missing_field_is_none_not_zero() {
        let store = ResultStore::new();
        assert!(store.get("never-analyzed").is_none());
        assert!(!store.contains("never-analyzed"));
    }
}
