//! Scenario bookkeeping
//!
//! A [`ScenarioRun`] records one scenario's Givens, When and Thens against a
//! shared [`ReportContext`] and produces a [`ScenarioRunResult`], which the
//! sink expands into report items.

use crate::config::ReportConfig;
use crate::error::ScenarioError;
use crate::item::ReportItem;
use gwt_compare::{Comparer, Detail, Given, ReportEntry, Then, When};
use gwt_graph::{Describe, LeafValue, TypeKey};
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// Title of the Then produced by an expected-error comparison
pub const EXCEPTION_TITLE: &str = "Exception";

/// Shared state for running scenarios
///
/// Passed explicitly to every scenario; there is no ambient report or scope.
#[derive(Debug, Clone)]
pub struct ReportContext {
    config: Arc<ReportConfig>,
    comparer: Arc<Comparer>,
}

impl ReportContext {
    /// Create context from configuration
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        let comparer = config.comparer();
        Self {
            config: Arc::new(config),
            comparer: Arc::new(comparer),
        }
    }

    /// Replace the comparer (custom equality, member filters, ...)
    #[must_use]
    pub fn with_comparer(mut self, comparer: Comparer) -> Self {
        self.comparer = Arc::new(comparer);
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Comparer used for Thens
    #[inline]
    #[must_use]
    pub fn comparer(&self) -> &Comparer {
        &self.comparer
    }

    /// Start recording a scenario
    #[must_use]
    pub fn scenario(&self, title: impl Into<String>) -> ScenarioRun<'_> {
        ScenarioRun {
            context: self,
            result: ScenarioRunResult::new(title),
        }
    }

    fn display_name(&self, value: &dyn Describe) -> String {
        self.comparer
            .reader()
            .classifier()
            .display_name(&value.type_key())
            .to_string()
    }
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

/// The error a When step is expected to raise
#[derive(Clone)]
pub struct ExpectedError {
    type_name: String,
    message: Option<String>,
    matches: fn(&(dyn Error + 'static)) -> bool,
}

fn is_error<E: Error + 'static>(error: &(dyn Error + 'static)) -> bool {
    error.is::<E>()
}

impl ExpectedError {
    /// Expect any error of type `E`
    #[must_use]
    pub fn of<E: Error + 'static>() -> Self {
        Self {
            type_name: TypeKey::of::<E>().display_name(),
            message: None,
            matches: is_error::<E>,
        }
    }

    /// Expect an error like `error`: same type, same message
    #[must_use]
    pub fn new<E: Error + 'static>(error: &E) -> Self {
        Self::of::<E>().with_message(error.to_string())
    }

    /// Expect this message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Display name of the expected type
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Expected message, if any
    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether `error` has the expected type
    #[must_use]
    pub fn matches(&self, error: &(dyn Error + 'static)) -> bool {
        (self.matches)(error)
    }
}

impl Debug for ExpectedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedError")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Recording of one scenario in progress
///
/// Steps consume and return the run, so a scenario reads as a chain:
///
/// ```rust,ignore
/// let result = context
///     .scenario("pays an invoice")
///     .given(&customer)?
///     .when(&payment)?
///     .then(&expected, &actual)?
///     .finish();
/// ```
#[derive(Debug)]
#[must_use]
pub struct ScenarioRun<'c> {
    context: &'c ReportContext,
    result: ScenarioRunResult,
}

impl ScenarioRun<'_> {
    /// Set the logical grouping for this scenario's Thens
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.result.set_scope(scope);
        self
    }

    /// Record an input
    ///
    /// # Errors
    /// [`ScenarioError::Read`] when the value cannot be read.
    pub fn given<T: Describe>(mut self, value: &T) -> Result<Self, ScenarioError> {
        let snapshot = self
            .context
            .comparer
            .reader()
            .read(value)
            .map_err(|source| ScenarioError::Read {
                step: "given",
                source,
            })?;
        self.result.push_given(Given::from_read(&snapshot));
        Ok(self)
    }

    /// Record the step under test
    ///
    /// # Errors
    /// [`ScenarioError::Read`] when the value cannot be read.
    pub fn when<T: Describe>(mut self, value: &T) -> Result<Self, ScenarioError> {
        let snapshot = self
            .context
            .comparer
            .reader()
            .read(value)
            .map_err(|source| ScenarioError::Read {
                step: "when",
                source,
            })?;
        self.result.set_when(When::from_read(&snapshot));
        Ok(self)
    }

    /// Compare one expected result with the actual one
    ///
    /// # Errors
    /// [`ScenarioError::Compare`] when either value cannot be read.
    pub fn then<E, A>(mut self, expected: &E, actual: &A) -> Result<Self, ScenarioError>
    where
        E: Describe,
        A: Describe,
    {
        let then = self
            .context
            .comparer
            .compare(self.result.scope(), expected, actual)?;
        self.result.push_then(then);
        Ok(self)
    }

    /// Compare expected and actual results by position
    ///
    /// Expected results without an actual counterpart become one "missing"
    /// Then each; surplus actual results become one "extra" Then each.
    ///
    /// # Errors
    /// [`ScenarioError::Compare`] when a paired value cannot be read.
    pub fn thens(
        mut self,
        expected: &[&dyn Describe],
        actual: &[&dyn Describe],
    ) -> Result<Self, ScenarioError> {
        let paired = expected.len().min(actual.len());
        for (expected, actual) in expected.iter().zip(actual) {
            let then = self
                .context
                .comparer
                .compare_dyn(self.result.scope(), *expected, *actual)?;
            self.result.push_then(then);
        }

        let scope = self.result.scope().map(str::to_string);
        for missing in &expected[paired..] {
            let type_name = self.context.display_name(*missing);
            self.result.push_then(Then::missing(scope.clone(), &type_name));
        }
        for extra in &actual[paired..] {
            let type_name = self.context.display_name(*extra);
            self.result.push_then(Then::extra(scope.clone(), &type_name));
        }
        if expected.len() != actual.len() {
            tracing::debug!(
                scenario = self.result.title(),
                expected = expected.len(),
                actual = actual.len(),
                "result counts differ"
            );
        }
        Ok(self)
    }

    /// Compare the error raised by the When step with the expected one
    ///
    /// The type is always compared. The message is compared when
    /// [`ReportConfig::compare_error_messages`] is set and `expected` carries
    /// one.
    pub fn then_error(
        mut self,
        expected: &ExpectedError,
        actual: Option<&(dyn Error + 'static)>,
    ) -> Self {
        let mut details = Vec::with_capacity(2);

        let expected_type = Some(LeafValue::new(expected.type_name().to_string()));
        details.push(match actual {
            Some(error) if expected.matches(error) => Detail::matched("type", expected_type),
            Some(error) => {
                Detail::mismatch("type", expected_type, Some(LeafValue::new(format!("{error:?}"))))
            }
            None => Detail::mismatch("type", expected_type, None),
        });

        if self.context.config.compare_error_messages {
            if let Some(message) = expected.message() {
                let actual_message = actual.map(ToString::to_string);
                let value = Some(LeafValue::new(message.to_string()));
                details.push(if actual_message.as_deref() == Some(message) {
                    Detail::matched("message", value)
                } else {
                    Detail::mismatch("message", value, actual_message.map(LeafValue::new))
                });
            }
        }

        let scope = self.result.scope().map(str::to_string);
        self.result.push_then(Then::new(EXCEPTION_TITLE, scope, details));
        self
    }

    /// Record an unexpected error; the scenario fails
    pub fn fail(mut self, error: &dyn Display) -> Self {
        self.result.set_error(error.to_string());
        self
    }

    /// Finish recording
    #[must_use]
    pub fn finish(self) -> ScenarioRunResult {
        self.result
    }
}

/// Everything recorded for one scenario
#[derive(Debug)]
pub struct ScenarioRunResult {
    title: String,
    scope: Option<String>,
    givens: Vec<Given>,
    when: Option<When>,
    thens: Vec<Then>,
    error: Option<String>,
}

impl ScenarioRunResult {
    /// Create empty result
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scope: None,
            givens: Vec::new(),
            when: None,
            thens: Vec::new(),
            error: None,
        }
    }

    /// Scenario title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Logical grouping
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Recorded inputs
    #[inline]
    #[must_use]
    pub fn givens(&self) -> &[Given] {
        &self.givens
    }

    /// Recorded When step
    #[inline]
    #[must_use]
    pub fn when(&self) -> Option<&When> {
        self.when.as_ref()
    }

    /// Recorded Thens
    #[inline]
    #[must_use]
    pub fn thens(&self) -> &[Then] {
        &self.thens
    }

    /// Unexpected error
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Add an input
    pub(crate) fn push_given(&mut self, given: Given) {
        self.givens.push(given);
    }

    /// Set the When step, replacing any earlier one
    pub(crate) fn set_when(&mut self, when: When) {
        self.when = Some(when);
    }

    /// Add a Then
    pub(crate) fn push_then(&mut self, then: Then) {
        self.thens.push(then);
    }

    /// Record an unexpected error
    pub(crate) fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// Set the scope and stamp it onto every unscoped Then
    ///
    /// Thens that already carry a scope keep it.
    pub fn set_scope(&mut self, scope: impl Into<String>) {
        let scope = scope.into();
        let mut stamped = 0_usize;
        for then in &mut self.thens {
            if then.backfill_scope(&scope) {
                stamped += 1;
            }
        }
        if stamped > 0 {
            tracing::debug!(scenario = %self.title, scope = %scope, stamped, "scope backfilled");
        }
        self.scope = Some(scope);
    }

    /// Whether every Then succeeded and no unexpected error was recorded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.thens.iter().all(ReportEntry::is_success)
    }

    /// Expand into report items, in report order
    ///
    /// A scenario without a When step gets the placeholder When.
    #[must_use]
    pub fn into_items(self) -> Vec<ReportItem> {
        let success = self.is_success();
        let Self {
            title,
            scope,
            givens,
            when,
            thens,
            error,
        } = self;

        let mut items = Vec::with_capacity(givens.len() + thens.len() + 3);
        items.push(ReportItem::StartScenario {
            title: title.clone(),
            scope,
        });
        items.extend(givens.into_iter().map(ReportItem::Given));
        items.push(ReportItem::When(when.unwrap_or_else(When::none)));
        items.extend(thens.into_iter().map(ReportItem::Then));
        items.push(ReportItem::EndScenario {
            title,
            success,
            error,
        });
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwt_compare::{DetailKind, EXTRA_RESULTS_TITLE, MISSING_RESULTS_TITLE, NO_WHEN_TITLE};
    use gwt_graph::describe_struct;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Payment {
        amount: i64,
        currency: String,
    }
    describe_struct!(Payment { amount, currency });

    #[derive(Debug)]
    struct Receipt {
        number: u32,
    }
    describe_struct!(Receipt { number });

    #[derive(Debug, thiserror::Error)]
    #[error("card declined: {0}")]
    struct Declined(String);

    #[derive(Debug, thiserror::Error)]
    #[error("timed out")]
    struct TimedOut;

    fn payment(amount: i64) -> Payment {
        Payment {
            amount,
            currency: "EUR".to_string(),
        }
    }

    #[test]
    fn records_steps_in_order() {
        let context = ReportContext::default();
        let result = context
            .scenario("pays")
            .given(&payment(10))
            .unwrap()
            .when(&"submit".to_string())
            .unwrap()
            .then(&Receipt { number: 1 }, &Receipt { number: 1 })
            .unwrap()
            .finish();

        assert_eq!(result.givens().len(), 1);
        assert_eq!(result.givens()[0].title(), "Payment");
        assert_eq!(result.when().map(ReportEntry::title), Some("String"));
        assert_eq!(result.thens().len(), 1);
        assert!(result.is_success());

        let labels: Vec<&str> = result.into_items().iter().map(ReportItem::label).collect();
        assert_eq!(
            labels,
            vec!["start_scenario", "given", "when", "then", "end_scenario"]
        );
    }

    #[test]
    fn missing_when_gets_placeholder() {
        let items = ReportContext::default().scenario("idle").finish().into_items();

        assert_eq!(items.len(), 3);
        match &items[1] {
            ReportItem::When(when) => assert_eq!(when.title(), NO_WHEN_TITLE),
            other => panic!("expected When, got {}", other.label()),
        }
    }

    #[test]
    fn unequal_result_lists() {
        let context = ReportContext::default();
        let a = Receipt { number: 1 };
        let b = payment(2);

        let result = context
            .scenario("lists")
            .with_scope("Billing")
            .thens(&[&a, &b], &[&a])
            .unwrap()
            .finish();
        assert_eq!(result.thens().len(), 2);
        assert!(result.thens()[0].is_success());
        assert_eq!(result.thens()[1].title(), MISSING_RESULTS_TITLE);
        assert_eq!(result.thens()[1].details()[0].render_value(), "Payment");
        assert_eq!(result.thens()[1].scope(), Some("Billing"));
        assert!(!result.is_success());

        let result = context
            .scenario("lists")
            .thens(&[], &[&a, &b])
            .unwrap()
            .finish();
        assert_eq!(result.thens().len(), 2);
        assert_eq!(result.thens()[0].title(), EXTRA_RESULTS_TITLE);
        assert_eq!(result.thens()[0].details()[0].render_actual(), "Receipt");
    }

    #[test]
    fn expected_error_by_type() {
        let context = ReportContext::default();
        let raised = Declined("insufficient funds".to_string());

        let result = context
            .scenario("declines")
            .then_error(&ExpectedError::of::<Declined>(), Some(&raised))
            .finish();
        let then = &result.thens()[0];
        assert_eq!(then.title(), EXCEPTION_TITLE);
        assert_eq!(then.details().len(), 1);
        assert_eq!(then.details()[0].kind(), DetailKind::Match);
        assert_eq!(then.details()[0].render_value(), "Declined");

        let result = context
            .scenario("declines")
            .then_error(&ExpectedError::of::<Declined>(), Some(&TimedOut))
            .finish();
        assert_eq!(result.thens()[0].details()[0].kind(), DetailKind::Mismatch);
        assert_eq!(result.thens()[0].details()[0].render_actual(), "TimedOut");

        let result = context
            .scenario("declines")
            .then_error(&ExpectedError::of::<Declined>(), None)
            .finish();
        assert_eq!(result.thens()[0].details()[0].render_actual(), "null");
    }

    #[test]
    fn expected_error_message_is_opt_in() {
        let expected = ExpectedError::new(&Declined("limit".to_string()));
        let raised = Declined("expired".to_string());

        let result = ReportContext::default()
            .scenario("declines")
            .then_error(&expected, Some(&raised))
            .finish();
        assert_eq!(result.thens()[0].details().len(), 1);
        assert!(result.is_success());

        let context = ReportContext::new(ReportConfig::new().with_compare_error_messages(true));
        let result = context
            .scenario("declines")
            .then_error(&expected, Some(&raised))
            .finish();
        let message = &result.thens()[0].details()[1];
        assert_eq!(message.name(), "message");
        assert_eq!(message.render_value(), "card declined: limit");
        assert_eq!(message.render_actual(), "card declined: expired");
        assert!(!result.is_success());
    }

    #[test]
    fn failure_marks_scenario_failed() {
        let result = ReportContext::default()
            .scenario("crashes")
            .fail(&"connection reset")
            .finish();

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("connection reset"));
    }

    #[test]
    fn read_errors_name_the_step() {
        let context = ReportContext::new(ReportConfig::new().with_max_pending_reads(1));
        let err = context
            .scenario("large")
            .given(&vec![payment(1), payment(2), payment(3)])
            .unwrap_err();

        assert!(matches!(err, ScenarioError::Read { step: "given", .. }));
    }

    #[test]
    fn scope_backfill_keeps_explicit_scopes() {
        let context = ReportContext::default();
        let mut result = context
            .scenario("late scope")
            .then(&1_u8, &1_u8)
            .unwrap()
            .thens(&[&2_u8, &3_u8], &[&2_u8])
            .unwrap()
            .finish();
        result.push_then(Then::new("Preset", Some("Shipping".to_string()), Vec::new()));

        assert!(result.thens().iter().take(3).all(|then| then.scope().is_none()));

        result.set_scope("Billing");
        let scopes: Vec<Option<&str>> = result.thens().iter().map(Then::scope).collect();
        assert_eq!(
            scopes,
            vec![Some("Billing"), Some("Billing"), Some("Billing"), Some("Shipping")]
        );

        result.set_scope("Orders");
        assert_eq!(result.thens()[0].scope(), Some("Billing"));
        assert_eq!(result.scope(), Some("Orders"));
    }
}
