//! Analysis orchestrator.
//!
//! Issues one analysis call per field and merges each response into the
//! session with a keyed upsert, so a run for one field can never clobber
//! another field's cached result. Failures are returned to the caller;
//! they never wipe existing state.

use crate::models::FieldAnalysisResult;
use crate::registry::FieldRegistry;
use crate::service::{AnalysisRequest, AnalysisService, ServiceError};
use crate::session::{RunStatus, Session};
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from orchestrating a single field's analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The field id does not resolve to a registered field.
    #[error("field '{0}' is not registered")]
    FieldNotFound(String),

    /// The field exists but its polygon cannot enclose an area.
    #[error("field '{0}' has no usable geometry")]
    MissingGeometry(String),

    /// A run for this field is already in flight.
    #[error("analysis already running for field '{0}'")]
    Busy(String),

    /// The external analysis call failed. The store stays untouched
    /// for this field.
    #[error("analysis failed for field '{field_id}': {source}")]
    Service {
        field_id: String,
        #[source]
        source: ServiceError,
    },
}

/// Resolve preconditions for a run: the field must exist, have usable
/// geometry, and not already be running. No state is mutated here.
fn prepare_request(
    session: &Session,
    registry: &FieldRegistry,
    field_id: &str,
) -> Result<AnalysisRequest, AnalysisError> {
    let field = registry
        .find(field_id)
        .ok_or_else(|| AnalysisError::FieldNotFound(field_id.to_string()))?;

    if !field.geometry.is_usable() {
        return Err(AnalysisError::MissingGeometry(field_id.to_string()));
    }

    if session.status(field_id) == RunStatus::Running {
        return Err(AnalysisError::Busy(field_id.to_string()));
    }

    Ok(AnalysisRequest::new(
        &field.geometry,
        session.analysis_type(),
    ))
}

/// Merge a successful payload outcome into the session, or surface the
/// failure. Either way the field returns to idle.
fn merge_outcome(
    session: &mut Session,
    field_id: &str,
    outcome: Result<crate::service::AnalysisPayload, ServiceError>,
) -> Result<FieldAnalysisResult, AnalysisError> {
    session.set_status(field_id, RunStatus::Idle);

    match outcome {
        Ok(payload) => {
            let result = payload.into_result();
            session.history.append(crate::models::ReportEntry::new(
                field_id,
                result.summary.clone(),
                result.prediction.clone(),
            ));
            session.store.upsert(field_id, result.clone());
            info!(
                "Analysis complete for field '{}' (combined stress {:.1})",
                field_id, result.summary.combined_stress
            );
            Ok(result)
        }
        Err(source) => {
            warn!("Analysis failed for field '{}': {}", field_id, source);
            Err(AnalysisError::Service {
                field_id: field_id.to_string(),
                source,
            })
        }
    }
}

/// Run one analysis for a field and merge the result into the session.
///
/// Preconditions are checked before the service is invoked; a failed
/// precondition mutates nothing. On service failure the store and
/// history stay unchanged for this field and the error is returned.
#[allow(dead_code)] // Single-field entry point for embedding; the CLI batches
pub async fn run_analysis<S: AnalysisService>(
    session: &mut Session,
    registry: &FieldRegistry,
    service: &S,
    field_id: &str,
) -> Result<FieldAnalysisResult, AnalysisError> {
    let request = prepare_request(session, registry, field_id)?;

    session.set_status(field_id, RunStatus::Running);
    debug!("Running analysis for field '{}'", field_id);

    let outcome = service.analyze(request).await;
    merge_outcome(session, field_id, outcome)
}

/// Run analyses for every selected field concurrently.
///
/// Service calls are issued together; each completion is merged
/// independently, so one field's failure never blocks or corrupts
/// another field's merge. Returns per-field outcomes in selection
/// order.
pub async fn run_selection<S: AnalysisService>(
    session: &mut Session,
    registry: &FieldRegistry,
    service: &S,
) -> Vec<(String, Result<FieldAnalysisResult, AnalysisError>)> {
    let ids: Vec<String> = session.selection().to_vec();
    let mut slots: Vec<Option<(String, Result<FieldAnalysisResult, AnalysisError>)>> =
        (0..ids.len()).map(|_| None).collect();

    // Validate every field and mark the runnable ones before any call
    // goes out, so re-entrant requests observe Running.
    let mut calls = Vec::new();
    for (index, field_id) in ids.iter().enumerate() {
        match prepare_request(session, registry, field_id) {
            Ok(request) => {
                session.set_status(field_id, RunStatus::Running);
                calls.push((index, field_id.clone(), request));
            }
            Err(err) => {
                warn!("Skipping field '{}': {}", field_id, err);
                slots[index] = Some((field_id.clone(), Err(err)));
            }
        }
    }

    let futures = calls.into_iter().map(|(index, field_id, request)| async move {
        let outcome = service.analyze(request).await;
        (index, field_id, outcome)
    });

    for (index, field_id, outcome) in join_all(futures).await {
        let merged = merge_outcome(session, &field_id, outcome);
        slots[index] = Some((field_id, merged));
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_summary, Field, Geometry, TimeSeriesPoint};
    use crate::service::AnalysisPayload;

    /// Mock service keyed off the first vertex longitude: a request for
    /// a polygon starting at lng N answers with combined stress N, and
    /// a negative lng answers with a failure.
    struct MockService;

    impl AnalysisService for MockService {
        async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisPayload, ServiceError> {
            let lng = request.polygon.coordinates[0][0][0];
            if lng < 0.0 {
                return Err(ServiceError::Status(500));
            }
            Ok(AnalysisPayload {
                summary: sample_summary(lng),
                prediction: None,
                stress_matrix: None,
                timeseries: vec![TimeSeriesPoint {
                    date: "2024-05-01".to_string(),
                    value: 0.6,
                }],
                heatmap: None,
            })
        }
    }

    fn field_at(id: &str, lng: f64) -> Field {
        Field::new(
            id,
            id,
            Geometry::new(vec![[lng, 0.0], [lng + 1.0, 0.0], [lng + 1.0, 1.0]]),
        )
    }

    fn registry_with(fields: Vec<Field>) -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        for field in fields {
            registry.add_field(field).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_successful_run_merges_and_records() {
        let registry = registry_with(vec![field_at("north-40", 22.0)]);
        let mut session = Session::new();

        let result = run_analysis(&mut session, &registry, &MockService, "north-40")
            .await
            .unwrap();

        assert_eq!(result.summary.combined_stress, 22.0);
        assert_eq!(
            session
                .store
                .get("north-40")
                .unwrap()
                .summary
                .combined_stress,
            22.0
        );
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history.latest().unwrap().field_id, "north-40");
        assert_eq!(session.status("north-40"), RunStatus::Idle);

        let fraction = result.summary.stress_fraction();
        assert_eq!(fraction.healthy, 78.0);
        assert_eq!(fraction.stressed, 22.0);
    }

    #[tokio::test]
    async fn test_unknown_field_fails_before_any_mutation() {
        let registry = registry_with(vec![]);
        let mut session = Session::new();

        let err = run_analysis(&mut session, &registry, &MockService, "ghost")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::FieldNotFound(_)));
        assert!(session.store.is_empty());
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_unusable_geometry_fails_before_any_mutation() {
        let mut registry = FieldRegistry::new();
        registry.insert_unchecked(Field::new(
            "thin",
            "Thin",
            Geometry::new(vec![[0.0, 0.0], [1.0, 1.0]]),
        ));

        let mut session = Session::new();
        let err = run_analysis(&mut session, &registry, &MockService, "thin")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::MissingGeometry(_)));
        assert!(session.store.is_empty());
        assert!(session.history.is_empty());
        assert_eq!(session.status("thin"), RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_busy_field_is_rejected() {
        let registry = registry_with(vec![field_at("north-40", 22.0)]);
        let mut session = Session::new();
        session.set_status("north-40", RunStatus::Running);

        let err = run_analysis(&mut session, &registry, &MockService, "north-40")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Busy(_)));
        assert!(session.store.is_empty());
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_failure_leaves_cached_results_untouched() {
        let registry = registry_with(vec![field_at("a", 10.0), field_at("b", -1.0)]);
        let mut session = Session::new();

        run_analysis(&mut session, &registry, &MockService, "a")
            .await
            .unwrap();
        let a_before = session.store.get("a").cloned().unwrap();
        let history_before = session.history.len();

        let err = run_analysis(&mut session, &registry, &MockService, "b")
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Service { .. }));
        assert_eq!(session.store.get("a"), Some(&a_before));
        assert!(session.store.get("b").is_none());
        assert_eq!(session.history.len(), history_before);
        assert_eq!(session.status("b"), RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_run_selection_merges_all_fields() {
        let registry = registry_with(vec![field_at("a", 10.0), field_at("b", 20.0)]);
        let mut session = Session::new();
        session.select("a");
        session.select("b");

        let outcomes = run_selection(&mut session, &registry, &MockService).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, "a");
        assert_eq!(outcomes[1].0, "b");
        assert!(outcomes.iter().all(|(_, r)| r.is_ok()));

        assert_eq!(session.store.get("a").unwrap().summary.combined_stress, 10.0);
        assert_eq!(session.store.get("b").unwrap().summary.combined_stress, 20.0);
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn test_run_selection_isolates_failures() {
        let registry = registry_with(vec![
            field_at("good", 15.0),
            field_at("bad", -1.0),
            field_at("also-good", 35.0),
        ]);
        let mut session = Session::new();
        session.select("good");
        session.select("bad");
        session.select("also-good");

        let outcomes = run_selection(&mut session, &registry, &MockService).await;

        assert!(outcomes[0].1.is_ok());
        assert!(matches!(
            outcomes[1].1,
            Err(AnalysisError::Service { .. })
        ));
        assert!(outcomes[2].1.is_ok());

        assert_eq!(session.store.len(), 2);
        assert!(session.store.get("bad").is_none());
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn test_run_selection_reports_unknown_fields_in_order() {
        let registry = registry_with(vec![field_at("known", 12.0)]);
        let mut session = Session::new();
        session.select("ghost");
        session.select("known");

        let outcomes = run_selection(&mut session, &registry, &MockService).await;

        assert_eq!(outcomes[0].0, "ghost");
        assert!(matches!(outcomes[0].1, Err(AnalysisError::FieldNotFound(_))));
        assert_eq!(outcomes[1].0, "known");
        assert!(outcomes[1].1.is_ok());
    }

    #[tokio::test]
    async fn test_rerun_last_write_wins_but_history_keeps_both() {
        let registry = registry_with(vec![field_at("a", 10.0)]);
        let mut session = Session::new();

        run_analysis(&mut session, &registry, &MockService, "a")
            .await
            .unwrap();
        run_analysis(&mut session, &registry, &MockService, "a")
            .await
            .unwrap();

        assert_eq!(session.store.len(), 1);
        assert_eq!(session.history.len(), 2);
    }
}
