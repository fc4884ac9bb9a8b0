use crate::{Outcome, TargetIndex};

/// Name of the sidecar file listing failed targets.
pub const FAILURE_LOG_FILENAME: &str = "failed_urls.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTarget {
    pub index: TargetIndex,
    pub url: String,
    pub outcome: Outcome,
}

/// Aggregate result of one run, entries in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    entries: Vec<CompletedTarget>,
}

impl BatchReport {
    pub(crate) fn new(entries: Vec<CompletedTarget>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CompletedTarget] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| !e.outcome.is_success())
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.outcome.is_success())
            .map(|e| e.url.as_str())
            .collect()
    }

    /// Contents of the failure log, or `None` when nothing failed.
    pub fn failure_log(&self) -> Option<String> {
        if !self.has_failures() {
            return None;
        }
        let mut log = String::new();
        for url in self.failed_targets() {
            log.push_str(url);
            log.push('\n');
        }
        Some(log)
    }
}
