//! GWT Object Graph
//!
//! Cycle-safe structural snapshots of arbitrary values.
//!
//! # Core Concepts
//!
//! - [`Describe`]: How a value exposes its shape (leaf, sequence, mapping, struct)
//! - [`ValueClassifier`]: Leaf vs structured decisions, terminal type registry
//! - [`Reader`]: Iterative traversal producing a [`ReadResult`] tree
//! - [`GraphTooLargeError`]: Pending-work cap exceeded
//!
//! # Example
//!
//! ```rust,ignore
//! use gwt_graph::{describe_struct, Reader, ReaderOptions};
//!
//! struct Invoice {
//!     amount: f64,
//!     currency: String,
//! }
//! describe_struct!(Invoice { amount: "0.00", currency });
//!
//! let reader = Reader::new(ReaderOptions::new().with_max_pending(1_000));
//! let snapshot = reader.read(&invoice)?;
//! assert_eq!(snapshot.properties()[0].name(), "amount");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

#[macro_use]
mod macros;

mod classify;
mod describe;
mod error;
mod impls;
mod reader;
mod value;

// Re-exports
pub use classify::{ShapeKind, TypeKey, ValueClassifier};
pub use describe::{Describe, Field, Shape, Value};
pub use error::GraphTooLargeError;
pub use reader::{MemberFilter, ReadResult, Reader, ReaderOptions, DEFAULT_MAX_PENDING};
pub use value::{FormatterFn, Formatting, LeafData, LeafValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
