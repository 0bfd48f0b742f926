//! Error types for scenario bookkeeping and the report sink

use gwt_compare::CompareError;
use gwt_graph::GraphTooLargeError;
use std::sync::Arc;
use thiserror::Error;

/// Scenario bookkeeping errors
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A Given or When value could not be read
    #[error("cannot read {step} value: {source}")]
    Read {
        /// Step being recorded
        step: &'static str,
        /// Underlying read error
        #[source]
        source: GraphTooLargeError,
    },

    /// A Then comparison could not read one of its values
    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Report sink errors
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    /// The writer failed or panicked; every later call sees the same failure
    #[error("report writer failed: {0:#}")]
    WriteFailed(Arc<anyhow::Error>),

    /// The final write was already requested
    #[error("report already finalized")]
    AlreadyFinalized,

    /// No Tokio runtime to drain on
    #[error("report sink needs a Tokio runtime")]
    NoRuntime,

    /// The drain task stopped before answering
    #[error("report drain stopped before completion")]
    DrainStopped,
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;
