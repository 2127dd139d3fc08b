//! Multi-field comparison and derived-metric aggregation.

pub mod compare;

pub use compare::{compare, comparison_rows, highest_risk, FieldComparison};
