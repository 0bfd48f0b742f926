//! Report configuration

use gwt_compare::Comparer;
use gwt_graph::{Reader, ReaderOptions, DEFAULT_MAX_PENDING};
use serde::{Deserialize, Serialize};

/// Report-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Title written in the report header
    pub title: String,
    /// Pending read cap for snapshots
    pub max_pending_reads: usize,
    /// Compare error messages, not just error types, in expected-error steps
    pub compare_error_messages: bool,
}

impl ReportConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With report title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// With pending read cap
    #[inline]
    #[must_use]
    pub fn with_max_pending_reads(mut self, max: usize) -> Self {
        self.max_pending_reads = max;
        self
    }

    /// With error message comparison
    #[inline]
    #[must_use]
    pub fn with_compare_error_messages(mut self, enabled: bool) -> Self {
        self.compare_error_messages = enabled;
        self
    }

    /// Reader options derived from this configuration
    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::new().with_max_pending(self.max_pending_reads)
    }

    /// Comparer reading with [`reader_options`](Self::reader_options)
    #[must_use]
    pub fn comparer(&self) -> Comparer {
        Comparer::new(Reader::new(self.reader_options()))
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Scenarios".to_string(),
            max_pending_reads: DEFAULT_MAX_PENDING,
            compare_error_messages: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = ReportConfig::new()
            .with_title("Billing")
            .with_max_pending_reads(64)
            .with_compare_error_messages(true);

        assert_eq!(config.title, "Billing");
        assert_eq!(config.reader_options().max_pending(), 64);
        assert!(config.compare_error_messages);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: ReportConfig = serde_json::from_str(r#"{ "title": "Orders" }"#).unwrap();

        assert_eq!(config.title, "Orders");
        assert_eq!(config.max_pending_reads, DEFAULT_MAX_PENDING);
        assert!(!config.compare_error_messages);
    }
}
