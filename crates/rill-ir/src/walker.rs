//! Typed traversal and structural matching.
//!
//! [`IrWalker`] dispatches operators to per-variant callbacks in
//! ascending topological order. Variants without a registered callback
//! are silently skipped; the first callback error aborts the walk and
//! surfaces to the caller. Call order is exactly
//! [`IrGraph::topological_sort`] — passes and tests rely on that.
//!
//! [`matches`] is the structural predicate for code that special-cases a
//! few variants inside a generic algorithm; sum-type matching makes it a
//! total function rather than a downcast.

use crate::errors::Result;
use crate::graph::{IrGraph, NodeId};
use crate::node::{
    BlockingAgg, Expr, Filter, IrNode, Limit, Map, MemorySink, MemorySource, MetadataResolver,
    NodeKind, NodeTag, OpKind, Range,
};

type Callback<'a, T> = Box<dyn FnMut(&IrNode, &T) -> Result<()> + 'a>;

/// Per-variant callback table over operator nodes.
#[derive(Default)]
pub struct IrWalker<'a> {
    on_memory_source: Option<Callback<'a, MemorySource>>,
    on_memory_sink: Option<Callback<'a, MemorySink>>,
    on_range: Option<Callback<'a, Range>>,
    on_map: Option<Callback<'a, Map>>,
    on_filter: Option<Callback<'a, Filter>>,
    on_limit: Option<Callback<'a, Limit>>,
    on_blocking_agg: Option<Callback<'a, BlockingAgg>>,
    on_metadata_resolver: Option<Callback<'a, MetadataResolver>>,
}

impl<'a> IrWalker<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_memory_source(
        mut self,
        f: impl FnMut(&IrNode, &MemorySource) -> Result<()> + 'a,
    ) -> Self {
        self.on_memory_source = Some(Box::new(f));
        self
    }

    pub fn on_memory_sink(
        mut self,
        f: impl FnMut(&IrNode, &MemorySink) -> Result<()> + 'a,
    ) -> Self {
        self.on_memory_sink = Some(Box::new(f));
        self
    }

    pub fn on_range(mut self, f: impl FnMut(&IrNode, &Range) -> Result<()> + 'a) -> Self {
        self.on_range = Some(Box::new(f));
        self
    }

    pub fn on_map(mut self, f: impl FnMut(&IrNode, &Map) -> Result<()> + 'a) -> Self {
        self.on_map = Some(Box::new(f));
        self
    }

    pub fn on_filter(mut self, f: impl FnMut(&IrNode, &Filter) -> Result<()> + 'a) -> Self {
        self.on_filter = Some(Box::new(f));
        self
    }

    pub fn on_limit(mut self, f: impl FnMut(&IrNode, &Limit) -> Result<()> + 'a) -> Self {
        self.on_limit = Some(Box::new(f));
        self
    }

    pub fn on_blocking_agg(
        mut self,
        f: impl FnMut(&IrNode, &BlockingAgg) -> Result<()> + 'a,
    ) -> Self {
        self.on_blocking_agg = Some(Box::new(f));
        self
    }

    pub fn on_metadata_resolver(
        mut self,
        f: impl FnMut(&IrNode, &MetadataResolver) -> Result<()> + 'a,
    ) -> Self {
        self.on_metadata_resolver = Some(Box::new(f));
        self
    }

    /// Visit every operator in topological order.
    pub fn walk(mut self, graph: &IrGraph) -> Result<()> {
        for id in graph.topological_sort() {
            self.visit(graph, id)?;
        }
        Ok(())
    }

    fn visit(&mut self, graph: &IrGraph, id: NodeId) -> Result<()> {
        let node = graph.node(id)?;
        let NodeKind::Operator(op) = node.kind() else {
            return Ok(());
        };
        match &op.kind {
            OpKind::MemorySource(payload) => {
                if let Some(f) = &mut self.on_memory_source {
                    f(node, payload)?;
                }
            }
            OpKind::MemorySink(payload) => {
                if let Some(f) = &mut self.on_memory_sink {
                    f(node, payload)?;
                }
            }
            OpKind::Range(payload) => {
                if let Some(f) = &mut self.on_range {
                    f(node, payload)?;
                }
            }
            OpKind::Map(payload) => {
                if let Some(f) = &mut self.on_map {
                    f(node, payload)?;
                }
            }
            OpKind::Filter(payload) => {
                if let Some(f) = &mut self.on_filter {
                    f(node, payload)?;
                }
            }
            OpKind::Limit(payload) => {
                if let Some(f) = &mut self.on_limit {
                    f(node, payload)?;
                }
            }
            OpKind::BlockingAgg(payload) => {
                if let Some(f) = &mut self.on_blocking_agg {
                    f(node, payload)?;
                }
            }
            OpKind::MetadataResolver(payload) => {
                if let Some(f) = &mut self.on_metadata_resolver {
                    f(node, payload)?;
                }
            }
        }
        Ok(())
    }
}

/// Structural patterns: single variants plus semantic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Any operator node.
    Operator,
    /// Any expression node.
    Expression,
    /// Column or Metadata (column-like once resolved).
    ColumnLike,
    /// Any literal (Int, String, Float, Bool).
    Literal,
    MemorySource,
    MemorySink,
    Range,
    Map,
    Filter,
    Limit,
    BlockingAgg,
    MetadataResolver,
    Column,
    Metadata,
    MetadataLiteral,
    Func,
    List,
    Lambda,
    Int,
    String,
    Float,
    Bool,
}

/// Test a node against a pattern.
pub fn matches(node: &IrNode, pattern: Pattern) -> bool {
    let tag = match pattern {
        Pattern::Operator => return node.is_operator(),
        Pattern::Expression => return node.is_expr(),
        Pattern::ColumnLike => return node.as_expr().is_some_and(Expr::is_column_like),
        Pattern::Literal => {
            return node
                .as_expr()
                .is_some_and(|e| matches!(e, Expr::Literal(_)));
        }
        Pattern::MemorySource => NodeTag::MemorySource,
        Pattern::MemorySink => NodeTag::MemorySink,
        Pattern::Range => NodeTag::Range,
        Pattern::Map => NodeTag::Map,
        Pattern::Filter => NodeTag::Filter,
        Pattern::Limit => NodeTag::Limit,
        Pattern::BlockingAgg => NodeTag::BlockingAgg,
        Pattern::MetadataResolver => NodeTag::MetadataResolver,
        Pattern::Column => NodeTag::Column,
        Pattern::Metadata => NodeTag::Metadata,
        Pattern::MetadataLiteral => NodeTag::MetadataLiteral,
        Pattern::Func => NodeTag::Func,
        Pattern::List => NodeTag::List,
        Pattern::Lambda => NodeTag::Lambda,
        Pattern::Int => NodeTag::Int,
        Pattern::String => NodeTag::String,
        Pattern::Float => NodeTag::Float,
        Pattern::Bool => NodeTag::Bool,
    };
    node.tag() == tag
}
