//! Given, When and Then entries

use crate::detail::Detail;
use gwt_graph::{LeafValue, ReadResult};
use serde::Serialize;

/// Title of the When placeholder for scenarios without one
pub const NO_WHEN_TITLE: &str = "No When provided";

/// Title of the Then emitted for expected results with no actual counterpart
pub const MISSING_RESULTS_TITLE: &str = "Missing expected results";

/// Title of the Then emitted for actual results with no expected counterpart
pub const EXTRA_RESULTS_TITLE: &str = "More results than expected";

/// Common view over entries
pub trait ReportEntry {
    /// Display title, usually the type name
    fn title(&self) -> &str;

    /// Details in member order
    fn details(&self) -> &[Detail];

    /// Whether every detail succeeded
    fn is_success(&self) -> bool {
        self.details().iter().all(Detail::is_success)
    }
}

/// Details for a snapshot: its members, or itself when it is a leaf
fn snapshot_details(result: &ReadResult) -> Vec<Detail> {
    let mut root = Detail::from_read(result);
    if result.kind().is_structured() && !result.is_truncated() {
        root.take_children()
    } else {
        vec![root]
    }
}

/// A scenario input
#[derive(Debug, Serialize)]
pub struct Given {
    title: String,
    details: Vec<Detail>,
}

impl Given {
    /// Create entry
    #[must_use]
    pub fn new(title: impl Into<String>, details: Vec<Detail>) -> Self {
        Self {
            title: title.into(),
            details,
        }
    }

    /// Entry for a snapshot
    #[must_use]
    pub fn from_read(result: &ReadResult) -> Self {
        Self::new(result.type_name(), snapshot_details(result))
    }
}

impl ReportEntry for Given {
    fn title(&self) -> &str {
        &self.title
    }

    fn details(&self) -> &[Detail] {
        &self.details
    }
}

/// The step under test
#[derive(Debug, Serialize)]
pub struct When {
    title: String,
    details: Vec<Detail>,
}

impl When {
    /// Create entry
    #[must_use]
    pub fn new(title: impl Into<String>, details: Vec<Detail>) -> Self {
        Self {
            title: title.into(),
            details,
        }
    }

    /// Entry for a snapshot
    #[must_use]
    pub fn from_read(result: &ReadResult) -> Self {
        Self::new(result.type_name(), snapshot_details(result))
    }

    /// Placeholder for scenarios without a When step
    #[must_use]
    pub fn none() -> Self {
        Self::new(NO_WHEN_TITLE, Vec::new())
    }

    /// Whether this is the placeholder
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.title == NO_WHEN_TITLE && self.details.is_empty()
    }
}

impl ReportEntry for When {
    fn title(&self) -> &str {
        &self.title
    }

    fn details(&self) -> &[Detail] {
        &self.details
    }
}

/// An expectation and how it compared
///
/// The scope can be unknown when the entry is created; it is stamped later
/// with [`Then::backfill_scope`] and never overwritten once set.
#[derive(Debug, Serialize)]
pub struct Then {
    title: String,
    scope: Option<String>,
    details: Vec<Detail>,
}

impl Then {
    /// Create entry
    #[must_use]
    pub fn new(title: impl Into<String>, scope: Option<String>, details: Vec<Detail>) -> Self {
        Self {
            title: title.into(),
            scope,
            details,
        }
    }

    /// Expected result with no actual counterpart
    #[must_use]
    pub fn missing(scope: Option<String>, expected_type: &str) -> Self {
        let detail = Detail::mismatch(
            expected_type,
            Some(LeafValue::new(expected_type.to_string())),
            None,
        );
        Self::new(MISSING_RESULTS_TITLE, scope, vec![detail])
    }

    /// Actual result with no expected counterpart
    #[must_use]
    pub fn extra(scope: Option<String>, actual_type: &str) -> Self {
        let detail = Detail::mismatch(
            actual_type,
            None,
            Some(LeafValue::new(actual_type.to_string())),
        );
        Self::new(EXTRA_RESULTS_TITLE, scope, vec![detail])
    }

    /// Logical grouping, if known
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Set the scope unless one is already set
    ///
    /// Returns whether the scope was stamped.
    pub fn backfill_scope(&mut self, scope: &str) -> bool {
        if self.scope.is_some() {
            return false;
        }
        self.scope = Some(scope.to_string());
        true
    }
}

impl ReportEntry for Then {
    fn title(&self) -> &str {
        &self.title
    }

    fn details(&self) -> &[Detail] {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::DetailKind;
    use gwt_graph::Reader;

    #[test]
    fn backfill_never_overwrites() {
        let mut unscoped = Then::new("Invoice", None, Vec::new());
        let mut scoped = Then::new("Invoice", Some("Billing".to_string()), Vec::new());

        assert!(unscoped.backfill_scope("Orders"));
        assert!(!scoped.backfill_scope("Orders"));
        assert!(!unscoped.backfill_scope("Later"));

        assert_eq!(unscoped.scope(), Some("Orders"));
        assert_eq!(scoped.scope(), Some("Billing"));
    }

    #[test]
    fn missing_and_extra_carry_a_type_mismatch() {
        let missing = Then::missing(None, "Invoice");
        assert_eq!(missing.title(), MISSING_RESULTS_TITLE);
        assert_eq!(missing.details().len(), 1);
        assert_eq!(missing.details()[0].kind(), DetailKind::Mismatch);
        assert_eq!(missing.details()[0].render_value(), "Invoice");
        assert_eq!(missing.details()[0].render_actual(), "null");
        assert!(!missing.is_success());

        let extra = Then::extra(None, "Receipt");
        assert_eq!(extra.title(), EXTRA_RESULTS_TITLE);
        assert_eq!(extra.details()[0].render_actual(), "Receipt");
    }

    #[test]
    fn leaf_snapshot_is_a_single_detail() {
        let given = Given::from_read(&Reader::default().read(&42_u8).unwrap());

        assert_eq!(given.title(), "u8");
        assert_eq!(given.details().len(), 1);
        assert_eq!(given.details()[0].render_value(), "42");
    }

    #[test]
    fn structured_snapshot_lists_members() {
        let when = When::from_read(&Reader::default().read(&vec!["a", "b"]).unwrap());

        assert_eq!(when.title(), "Vec<&str>");
        assert_eq!(when.details().len(), 2);
        assert_eq!(when.details()[1].name(), "[1]");
    }

    #[test]
    fn placeholder_when() {
        let when = When::none();
        assert!(when.is_none());
        assert_eq!(when.title(), NO_WHEN_TITLE);
        assert!(when.is_success());
    }
}
