//! Deep graph cloning.
//!
//! The clone is a fresh graph with freshly allocated ids; nothing in it
//! aliases the source. Operators are cloned in topological order so that
//! by the time a node is copied, every id it needs to re-target is
//! already present in the old→new map: parents precede children, and a
//! resolver precedes every metadata expression bound through it.
//! Expression trees are cloned bottom-up and memoized, so references
//! shared within an operator stay shared in the clone.
//!
//! Inconsistencies found here (an unmapped reference, an operator in
//! expression position) are `Error::Internal`: they mean the clone
//! algorithm or a graph invariant is broken, not that input was bad.

use std::collections::BTreeMap;

use crate::errors::{Error, Result};
use crate::graph::{IrGraph, NodeId};
use crate::node::{
    BlockingAgg, ColExpr, Column, Expr, Filter, Func, Lambda, LambdaBody, List, Map, MemorySource,
    Metadata, MetadataLiteral, NodeKind, OpKind, Operator, Range,
};

type IdMap = BTreeMap<NodeId, NodeId>;

fn remap(map: &IdMap, id: NodeId) -> Result<NodeId> {
    map.get(&id)
        .copied()
        .ok_or_else(|| Error::Internal(format!("clone: node {id} was not mapped yet")))
}

impl IrGraph {
    /// Deep-copy this graph into an independent one.
    ///
    /// Preserves topological shape, resolved relations and bindings, and
    /// metadata property references (shared, not duplicated). Returns the
    /// clone together with the old→new id mapping.
    pub fn clone_graph(&self) -> Result<(IrGraph, BTreeMap<NodeId, NodeId>)> {
        let mut out = IrGraph::new().with_node_cap(self.node_cap());
        let mut map = IdMap::new();

        for op_id in self.topological_sort() {
            self.clone_operator(op_id, &mut out, &mut map)?;
        }

        // Scratch expressions not owned by any operator (including consumed
        // lambdas). Memoization keeps their references shared with the
        // operator copies made above.
        let leftover: Vec<NodeId> = self
            .nodes()
            .map(|n| n.id())
            .filter(|id| !map.contains_key(id))
            .collect();
        for id in leftover {
            self.clone_expr(id, &mut out, &mut map)?;
        }

        for (parent, child) in self.edge_list() {
            out.record_edge(remap(&map, parent)?, remap(&map, child)?);
        }

        Ok((out, map))
    }

    fn clone_operator(&self, op_id: NodeId, out: &mut IrGraph, map: &mut IdMap) -> Result<()> {
        let node = self.node(op_id)?;
        let operator = node
            .as_operator()
            .ok_or_else(|| Error::Internal(format!("clone: node {op_id} is not an operator")))?;

        // Owned expression roots, cloned before the operator itself.
        let owned: Vec<NodeId> = match &operator.kind {
            OpKind::MemorySource(src) => src.columns.clone(),
            OpKind::MemorySink(_) | OpKind::Limit(_) | OpKind::MetadataResolver(_) => vec![],
            OpKind::Range(range) => vec![range.start, range.stop],
            OpKind::Map(map_op) => map_op.col_exprs.iter().map(|ce| ce.expr).collect(),
            OpKind::Filter(filter) => vec![filter.expr],
            OpKind::BlockingAgg(agg) => agg
                .agg_exprs
                .iter()
                .map(|ce| ce.expr)
                .chain(agg.groups.iter().copied())
                .collect(),
        };
        for &root in &owned {
            self.clone_expr(root, out, map)?;
        }

        let parents = operator
            .parents()
            .iter()
            .map(|&p| remap(map, p))
            .collect::<Result<Vec<_>>>()?;

        let kind = match &operator.kind {
            OpKind::MemorySource(src) => OpKind::MemorySource(MemorySource {
                table: src.table.clone(),
                column_names: src.column_names.clone(),
                columns: src
                    .columns
                    .iter()
                    .map(|&c| remap(map, c))
                    .collect::<Result<Vec<_>>>()?,
                columns_set: src.columns_set,
                time_range: src.time_range,
            }),
            OpKind::MemorySink(sink) => OpKind::MemorySink(sink.clone()),
            OpKind::Range(range) => OpKind::Range(Range {
                start: remap(map, range.start)?,
                stop: remap(map, range.stop)?,
            }),
            OpKind::Map(map_op) => OpKind::Map(Map {
                col_exprs: self.remap_col_exprs(&map_op.col_exprs, map)?,
            }),
            OpKind::Filter(filter) => OpKind::Filter(Filter {
                expr: remap(map, filter.expr)?,
            }),
            OpKind::Limit(limit) => OpKind::Limit(limit.clone()),
            OpKind::BlockingAgg(agg) => OpKind::BlockingAgg(BlockingAgg {
                windowed: agg.windowed,
                agg_exprs: self.remap_col_exprs(&agg.agg_exprs, map)?,
                groups: agg
                    .groups
                    .iter()
                    .map(|&g| remap(map, g))
                    .collect::<Result<Vec<_>>>()?,
            }),
            // Property references are shared, not duplicated.
            OpKind::MetadataResolver(resolver) => OpKind::MetadataResolver(resolver.clone()),
        };

        let new_id = out.alloc(
            node.span(),
            NodeKind::Operator(Operator {
                parents,
                relation: operator.relation().cloned(),
                kind,
            }),
        )?;
        map.insert(op_id, new_id);

        // Containing-operator stamps could not be written while the
        // operator id was still unmapped; stamp the cloned trees now.
        for &root in &owned {
            out.attach_expr(remap(map, root)?, new_id)?;
        }
        Ok(())
    }

    fn remap_col_exprs(&self, col_exprs: &[ColExpr], map: &IdMap) -> Result<Vec<ColExpr>> {
        col_exprs
            .iter()
            .map(|ce| {
                Ok(ColExpr {
                    name: ce.name.clone(),
                    expr: remap(map, ce.expr)?,
                })
            })
            .collect()
    }

    fn clone_expr(&self, id: NodeId, out: &mut IrGraph, map: &mut IdMap) -> Result<NodeId> {
        if let Some(&mapped) = map.get(&id) {
            return Ok(mapped);
        }
        let node = self.node(id)?;
        let expr = node
            .as_expr()
            .ok_or_else(|| Error::Internal(format!("clone: node {id} is not an expression")))?;

        let cloned = match expr {
            Expr::Literal(lit) => Expr::Literal(lit.clone()),
            Expr::Column(col) => Expr::Column(self.clone_column(col, map)),
            Expr::Metadata(md) => Expr::Metadata(Metadata {
                column: self.clone_column(&md.column, map),
                property: md.property.clone(),
                resolver: md.resolver.map(|r| remap(map, r)).transpose()?,
            }),
            Expr::MetadataLiteral(ml) => Expr::MetadataLiteral(MetadataLiteral {
                literal: self.clone_expr(ml.literal, out, map)?,
            }),
            Expr::Func(func) => Expr::Func(Func {
                op: func.op.clone(),
                prefix: func.prefix.clone(),
                args: func
                    .args
                    .iter()
                    .map(|&a| self.clone_expr(a, out, map))
                    .collect::<Result<Vec<_>>>()?,
                compile_time: func.compile_time,
                func_id: func.func_id,
                evaluated_type: func.evaluated_type,
            }),
            Expr::List(list) => Expr::List(List {
                children: list
                    .children
                    .iter()
                    .map(|&c| self.clone_expr(c, out, map))
                    .collect::<Result<Vec<_>>>()?,
            }),
            Expr::Lambda(lambda) => Expr::Lambda(Lambda {
                expected_columns: lambda.expected_columns.clone(),
                body: match &lambda.body {
                    LambdaBody::ColExprs(col_exprs) => LambdaBody::ColExprs(
                        col_exprs
                            .iter()
                            .map(|ce| {
                                Ok(ColExpr {
                                    name: ce.name.clone(),
                                    expr: self.clone_expr(ce.expr, out, map)?,
                                })
                            })
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    LambdaBody::Single(body) => LambdaBody::Single(self.clone_expr(*body, out, map)?),
                },
            }),
        };

        let new_id = out.alloc(node.span(), NodeKind::Expr(cloned))?;
        map.insert(id, new_id);
        Ok(new_id)
    }

    /// Copy a column, carrying the containing-operator stamp over only if
    /// the owner is already mapped (stragglers); operator-owned trees are
    /// re-stamped by `clone_operator` once the owner's new id exists.
    fn clone_column(&self, col: &Column, map: &IdMap) -> Column {
        Column {
            name: col.name.clone(),
            parent_op_idx: col.parent_op_idx,
            resolved: col.resolved,
            containing_op: col.containing_op.and_then(|op| map.get(&op).copied()),
        }
    }
}
