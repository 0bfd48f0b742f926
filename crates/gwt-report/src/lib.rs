//! GWT Report
//!
//! Scenario bookkeeping and the ordered asynchronous report sink.
//!
//! # Core Concepts
//!
//! - [`ReportContext`]: Explicit shared state (configuration, comparer) for scenarios
//! - [`ScenarioRun`]: Records Givens, When and Thens into a [`ScenarioRunResult`]
//! - [`ReportItem`]: Closed set of events consumed by renderers
//! - [`ReportSink`]: Non-blocking, ordered, single-writer delivery to a [`ReportWriter`]
//!
//! # Example
//!
//! ```rust,ignore
//! use gwt_report::{ReportConfig, ReportContext, ReportSink};
//!
//! let config = ReportConfig::new().with_title("Billing");
//! let sink = ReportSink::new(&config, writer)?;
//! let context = ReportContext::new(config);
//!
//! let result = context
//!     .scenario("pays an invoice")
//!     .given(&customer)?
//!     .when(&payment)?
//!     .then(&expected, &actual)?
//!     .finish();
//! sink.report(result);
//!
//! sink.write_final().await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod error;
mod item;
mod scenario;
mod sink;

// Re-exports
pub use config::ReportConfig;
pub use error::{ScenarioError, SinkError, SinkResult};
pub use item::ReportItem;
pub use scenario::{
    ExpectedError, ReportContext, ScenarioRun, ScenarioRunResult, EXCEPTION_TITLE,
};
pub use sink::{ReportSink, ReportWriter, SinkState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
