//! GWT Structural Comparer
//!
//! Diff trees between expected and actual object graph snapshots.
//!
//! # Core Concepts
//!
//! - [`Comparer`]: Lock-step walk of two snapshots, driven by the expected shape
//! - [`Detail`]: Diff tree node ([`Outcome::Match`], [`Outcome::Mismatch`], [`Outcome::Failure`])
//! - [`Given`], [`When`], [`Then`]: Report entries carrying details
//!
//! # Example
//!
//! ```rust,ignore
//! use gwt_compare::{Comparer, ReportEntry};
//!
//! let comparer = Comparer::default().with_equality::<f64, _>(|a, b| (a - b).abs() < 1e-9);
//! let then = comparer.compare(Some("Billing"), &expected, &actual)?;
//! assert!(then.is_success());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod comparer;
mod detail;
mod entry;
mod error;

// Re-exports
pub use comparer::{Comparer, EqualityFn, CYCLE_MARKER};
pub use detail::{Detail, DetailKind, Outcome};
pub use entry::{
    Given, ReportEntry, Then, When, EXTRA_RESULTS_TITLE, MISSING_RESULTS_TITLE, NO_WHEN_TITLE,
};
pub use error::{CompareError, Side};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
