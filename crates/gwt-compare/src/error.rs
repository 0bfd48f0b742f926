//! Comparison errors

use gwt_graph::GraphTooLargeError;
use thiserror::Error;

/// Comparison errors
///
/// Mismatches are data, not errors; the only failure is a snapshot that could
/// not be read.
#[derive(Debug, Clone, Error)]
pub enum CompareError {
    /// Reading the expected or actual value exceeded the pending cap
    #[error("cannot read {side} value: {source}")]
    GraphTooLarge {
        /// Which side failed
        side: Side,
        /// Reader error naming the offending type
        #[source]
        source: GraphTooLargeError,
    },
}

/// Side of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The expected value
    Expected,
    /// The actual value
    Actual,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expected => f.write_str("expected"),
            Self::Actual => f.write_str("actual"),
        }
    }
}

impl CompareError {
    /// The reader error behind this failure
    #[must_use]
    pub fn graph_error(&self) -> &GraphTooLargeError {
        match self {
            Self::GraphTooLarge { source, .. } => source,
        }
    }
}
