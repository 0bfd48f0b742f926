//! Report items
//!
//! The closed set of events a renderer consumes. A report is
//! `StartReport (StartScenario Given* When Then* EndScenario)* EndReport`,
//! and one scenario's items are never interleaved with another's.

use chrono::{DateTime, Utc};
use gwt_compare::{Given, Then, When};
use serde::Serialize;

/// One element of the report stream
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportItem {
    /// Report header
    StartReport {
        /// Report title
        title: String,
        /// When the report was opened
        started_at: DateTime<Utc>,
    },
    /// First item of a scenario
    StartScenario {
        /// Scenario title
        title: String,
        /// Logical grouping
        scope: Option<String>,
    },
    /// Scenario input
    Given(Given),
    /// Step under test
    When(When),
    /// Expectation and comparison
    Then(Then),
    /// Last item of a scenario
    EndScenario {
        /// Scenario title
        title: String,
        /// Whether every Then matched and nothing failed
        success: bool,
        /// Unexpected error raised by the scenario
        error: Option<String>,
    },
    /// Report footer
    EndReport {
        /// When the report was finalized
        finished_at: DateTime<Utc>,
    },
}

impl ReportItem {
    /// Short label of the variant
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::StartReport { .. } => "start_report",
            Self::StartScenario { .. } => "start_scenario",
            Self::Given(_) => "given",
            Self::When(_) => "when",
            Self::Then(_) => "then",
            Self::EndScenario { .. } => "end_scenario",
            Self::EndReport { .. } => "end_report",
        }
    }
}
