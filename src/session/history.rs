//! Report history.
//!
//! Append-only, newest-first log of completed analysis runs. Unlike
//! the result store, which keeps only the current value per field, the
//! history accumulates one entry per run and never rewrites past
//! entries.

use crate::models::ReportEntry;
use std::collections::VecDeque;

/// Newest-first log of completed runs. Unbounded.
#[derive(Debug, Default)]
pub struct ReportHistory {
    entries: VecDeque<ReportEntry>,
}

impl ReportHistory {
    /// Create an empty history.
    #[allow(dead_code)] // Constructor for embedding; Session builds via Default
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a completed run. O(1).
    pub fn append(&mut self, entry: ReportEntry) {
        self.entries.push_front(entry);
    }

    /// All entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter()
    }

    /// The most recent entry, if any run has completed.
    #[allow(dead_code)] // Utility accessor
    pub fn latest(&self) -> Option<&ReportEntry> {
        self.entries.front()
    }

    /// Number of recorded runs.
    #[allow(dead_code)] // Utility accessor
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no run has completed yet.
    #[allow(dead_code)] // Utility accessor
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_summary;

    #[test]
    fn test_newest_first() {
        let mut history = ReportHistory::new();
        history.append(ReportEntry::new("a", sample_summary(10.0), None));
        history.append(ReportEntry::new("b", sample_summary(20.0), None));
        history.append(ReportEntry::new("a", sample_summary(30.0), None));

        assert_eq!(history.len(), 3);
        let order: Vec<f64> = history
            .entries()
            .map(|e| e.summary.combined_stress)
            .collect();
        assert_eq!(order, vec![30.0, 20.0, 10.0]);
        assert_eq!(history.latest().unwrap().field_id, "a");
    }

    #[test]
    fn test_earlier_entries_survive_later_runs() {
        let mut history = ReportHistory::new();
        history.append(ReportEntry::new("a", sample_summary(10.0), None));
        let first = history.latest().cloned().unwrap();

        // A re-run for the same field adds an entry; it must not touch
        // the one already recorded.
        history.append(ReportEntry::new("a", sample_summary(55.0), None));

        let oldest = history.entries().last().unwrap();
        assert_eq!(*oldest, first);
        assert_eq!(history.len(), 2);
    }
}
