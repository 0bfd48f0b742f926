//! Error types for graph reads

/// A read exceeded the pending-work cap
///
/// This is a configuration error, not a transient one: register the offending
/// type as terminal, filter its members, or raise the cap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "object graph too large while reading `{type_name}`: more than {limit} pending reads \
     (pending types: {}); register `{type_name}` as a terminal type or skip its members",
    .pending.join(", ")
)]
pub struct GraphTooLargeError {
    /// Type being expanded when the cap was exceeded
    pub type_name: String,
    /// Configured cap
    pub limit: usize,
    /// Distinct types still pending, most recent first
    pub pending: Vec<String>,
}
