//! Error taxonomy for IR construction and lowering.
//!
//! Every public operation returns a `Result`; malformed input is never
//! fatal. `Internal` is the one programming-error class: it signals that a
//! core invariant (notably during graph cloning) was violated by the
//! implementation itself, not by caller input.

use thiserror::Error;

use crate::graph::NodeId;

/// Result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Bad argument-map contents, wrong arity, wrong node kind, or an
    /// out-of-range parent index.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown metadata name or an id that is not in the graph.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested edge would violate the DAG invariant.
    #[error("cycle detected: edge {parent} -> {child} would close a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    /// Lowering or lookup attempted before resolution completed.
    #[error("unresolved: {0}")]
    Unresolved(String),

    /// Node cap exceeded.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Core invariant violated; indicates a bug in the IR layer itself.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
