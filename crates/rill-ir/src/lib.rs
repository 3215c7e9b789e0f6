//! rill IR: the typed graph between parsed queries and the physical plan.
//!
//! The compiler front end turns parsed source constructs into operator
//! and expression nodes owned by an [`IrGraph`]; resolution passes bind
//! columns, metadata, and relations; lowering serializes the validated
//! DAG into `rill-plan` messages.
//!
//! - `node` - the node model (operator/expression variants)
//! - `graph` - DAG storage and mutation primitives
//! - `build` - constructors and the argument-map init protocol
//! - `metadata` - metadata registry and resolution
//! - `walker` - typed traversal and structural matching
//! - `lower` - physical-plan lowering
//! - `dump` - one-line-per-node graph rendering
//!
//! # Example
//!
//! ```
//! use rill_ir::{ArgMap, IrGraph};
//! use rowan::TextRange;
//!
//! let span = TextRange::empty(0.into());
//! let mut g = IrGraph::new();
//! let table = g.add_string(span, "conn_stats").unwrap();
//! let col = g.add_string(span, "bytes_sent").unwrap();
//! let select = g.add_list(span, vec![col]).unwrap();
//! let args = ArgMap::from([("table", table), ("select", select)]);
//! let src = g.add_memory_source(span, None, args).unwrap();
//! assert!(g.operator(src).is_ok());
//! ```

pub mod argmap;
pub mod build;
mod clone;
mod dump;
pub mod errors;
pub mod graph;
mod lower;
pub mod metadata;
pub mod node;
pub mod types;
pub mod walker;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod build_tests;
#[cfg(test)]
mod graph_tests;
#[cfg(test)]
mod node_tests;

pub use argmap::ArgMap;
pub use build::col_expr;
pub use errors::{Error, Result};
pub use graph::{DEFAULT_NODE_CAP, IrGraph, NodeId};
pub use metadata::{MetadataHandler, MetadataProperty, MetadataType};
pub use node::{
    BlockingAgg, ColExpr, Column, Expr, Filter, Func, FuncOp, IrNode, Lambda, LambdaBody, Limit,
    List, Literal, Map, MemorySink, MemorySource, Metadata, MetadataLiteral, MetadataResolver,
    NodeKind, NodeTag, OpKind, Opcode, Operator, RUNTIME_FUNC_PREFIX, Range, ResolvedColumn,
    TimeRange,
};
pub use types::{DataType, Relation, RelationColumn};
pub use walker::{IrWalker, Pattern, matches};
