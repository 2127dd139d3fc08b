//! Markdown and JSON stress report generation.
//!
//! Renders a fixed-format report from the export snapshots and run
//! history. Layout only; all numbers come from the session state.

use crate::analysis::{comparison_rows, FieldComparison};
use crate::models::{ReportEntry, ReportSnapshot};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Analysis service endpoint used for the runs.
    pub service_url: String,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Analysis model type the runs used.
    pub analysis_type: String,
    /// Number of fields with results in the report.
    pub fields_analyzed: usize,
    /// Number of selected fields whose runs failed.
    pub fields_failed: usize,
    /// Wall time for the run batch, in seconds.
    pub duration_seconds: f64,
}

/// The complete stress report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Per-field export snapshots, in selection order.
    pub snapshots: Vec<ReportSnapshot>,
    /// Run history, newest first.
    pub history: Vec<ReportEntry>,
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, comparisons: &[FieldComparison]) -> String {
    let mut output = String::new();

    output.push_str("# CropWatch Stress Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_field_sections(&report.snapshots));
    output.push_str(&generate_comparison_section(comparisons));
    output.push_str(&generate_history_section(&report.history));
    output.push_str("\n---\n\n*Generated by CropWatch*\n");

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Service:** {}\n", metadata.service_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Type:** {}\n", metadata.analysis_type));
    section.push_str(&format!(
        "- **Fields Analyzed:** {}\n",
        metadata.fields_analyzed
    ));
    if metadata.fields_failed > 0 {
        section.push_str(&format!(
            "- **Fields Failed:** {}\n",
            metadata.fields_failed
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate one section per analyzed field.
fn generate_field_sections(snapshots: &[ReportSnapshot]) -> String {
    if snapshots.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Fields\n\n");

    for snapshot in snapshots {
        let summary = &snapshot.summary;
        let fraction = summary.stress_fraction();

        section.push_str(&format!(
            "### {} (`{}`)\n\n",
            snapshot.field_name, snapshot.field_id
        ));
        section.push_str(&format!(
            "- NDVI Health: {:.2}%\n",
            summary.health_score
        ));
        section.push_str(&format!("- NDVI Stress: {:.2}%\n", summary.ndvi_stress));
        section.push_str(&format!(
            "- Thermal Stress: {:.2}%\n",
            summary.thermal_stress
        ));
        section.push_str(&format!(
            "- Moisture Stress: {:.2}%\n",
            summary.moisture_stress
        ));
        section.push_str(&format!(
            "- Combined Stress: {:.2}% (healthy {:.2}% / stressed {:.2}%)\n",
            summary.combined_stress, fraction.healthy, fraction.stressed
        ));
        section.push_str(&format!("- Stress Cause: {}\n", summary.stress_cause));
        section.push_str(&format!(
            "- Mean Temp: {:.2} °C\n",
            summary.mean_temperature_c
        ));
        section.push_str(&format!("- Mean NDWI: {:.3}\n", summary.mean_ndwi));
        section.push_str(&format!(
            "- Confidence: {:.2}%\n",
            summary.confidence_score
        ));

        if let Some(ref prediction) = snapshot.prediction {
            section.push_str(&format!(
                "- 7-Day Forecast: {:.2}% stress, risk {} {}\n",
                prediction.predicted_stress_next_7_days,
                prediction.risk_level.emoji(),
                prediction.risk_level
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the side-by-side comparison table.
fn generate_comparison_section(comparisons: &[FieldComparison]) -> String {
    if comparisons.len() < 2 {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Comparison\n\n");

    section.push_str("| Metric |");
    for comparison in comparisons {
        section.push_str(&format!(" {} |", comparison.field_id));
    }
    section.push('\n');

    section.push_str("|:---|");
    for _ in comparisons {
        section.push_str(":---:|");
    }
    section.push('\n');

    for (label, values) in comparison_rows(comparisons) {
        section.push_str(&format!("| {} |", label));
        for value in values {
            match value {
                Some(v) => section.push_str(&format!(" {:.2} |", v)),
                // Missing data stays visibly missing, never a zero.
                None => section.push_str(" no data |"),
            }
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate the run history section, newest first.
fn generate_history_section(history: &[ReportEntry]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Run History\n\n");
    section.push_str("| Date | Field | Combined Stress | Risk |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");

    for entry in history {
        let risk = entry
            .prediction
            .as_ref()
            .map(|p| format!("{} {}", p.risk_level.emoji(), p.risk_level))
            .unwrap_or_else(|| "—".to_string());
        section.push_str(&format!(
            "| {} | {} | {:.2}% | {} |\n",
            entry.date.format("%Y-%m-%d %H:%M:%S"),
            entry.field_id,
            entry.summary.combined_stress,
            risk
        ));
    }
    section.push('\n');

    section
}
