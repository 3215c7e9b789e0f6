//! Physical-plan wire format for the rill query compiler.
//!
//! The compiler's IR layer lowers a validated operator graph into the
//! message types defined here; the execution engine consumes them. Two
//! encodings are provided:
//! - a canonical JSON view (`to_json`/`from_json`), used for golden
//!   comparisons and debugging
//! - a compact binary encoding via postcard (`to_binary`/`from_binary`)
//!
//! This crate is pure data: no graph logic, no validation beyond decoding.

mod binary;
mod json;
mod plan;

#[cfg(test)]
mod binary_tests;
#[cfg(test)]
mod json_tests;

pub use json::PlanError;
pub use plan::{
    AggregateExpression, AggregateOp, ColumnReference, DataType, FilterOp, LimitOp, LiteralValue,
    MapOp, MemorySinkOp, MemorySourceOp, OpType, Operator, ScalarExpression, ScalarFunc,
    ScalarValue, TimestampValue,
};
