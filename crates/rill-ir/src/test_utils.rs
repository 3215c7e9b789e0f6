//! Shared builders for IR tests.

use rowan::TextRange;

use crate::argmap::ArgMap;
use crate::build::col_expr;
use crate::graph::{IrGraph, NodeId};
use crate::node::{FuncOp, LambdaBody, Opcode, RUNTIME_FUNC_PREFIX};

pub fn span() -> TextRange {
    TextRange::empty(0.into())
}

pub fn make_int(g: &mut IrGraph, value: i64) -> NodeId {
    g.add_int(span(), value).unwrap()
}

pub fn make_string(g: &mut IrGraph, value: &str) -> NodeId {
    g.add_string(span(), value).unwrap()
}

pub fn make_column(g: &mut IrGraph, name: &str, parent_op_idx: usize) -> NodeId {
    g.add_column(span(), name, parent_op_idx).unwrap()
}

pub fn make_metadata(g: &mut IrGraph, name: &str, parent_op_idx: usize) -> NodeId {
    g.add_metadata(span(), name, parent_op_idx).unwrap()
}

pub fn make_metadata_literal(g: &mut IrGraph, literal: NodeId) -> NodeId {
    g.add_metadata_literal(span(), literal).unwrap()
}

pub fn make_add_func(g: &mut IrGraph, left: NodeId, right: NodeId) -> NodeId {
    g.add_func(
        span(),
        FuncOp::new(Opcode::Add, "+", "add"),
        RUNTIME_FUNC_PREFIX,
        vec![left, right],
        false,
    )
    .unwrap()
}

pub fn make_equals_func(g: &mut IrGraph, left: NodeId, right: NodeId) -> NodeId {
    g.add_func(
        span(),
        FuncOp::new(Opcode::Eq, "==", "equals"),
        RUNTIME_FUNC_PREFIX,
        vec![left, right],
        false,
    )
    .unwrap()
}

pub fn make_mean_func(g: &mut IrGraph, value: NodeId) -> NodeId {
    g.add_func(
        span(),
        FuncOp::new(Opcode::NonOp, "", "mean"),
        RUNTIME_FUNC_PREFIX,
        vec![value],
        false,
    )
    .unwrap()
}

pub fn make_mem_source(g: &mut IrGraph) -> NodeId {
    make_mem_source_named(g, "test_table", &["col1"])
}

pub fn make_mem_source_named(g: &mut IrGraph, table: &str, select: &[&str]) -> NodeId {
    let table = make_string(g, table);
    let cols: Vec<NodeId> = select.iter().map(|c| make_string(g, c)).collect();
    let select = g.add_list(span(), cols).unwrap();
    g.add_memory_source(span(), None, ArgMap::from([("table", table), ("select", select)]))
        .unwrap()
}

pub fn make_map(g: &mut IrGraph, parent: NodeId, cols: Vec<(&str, NodeId)>) -> NodeId {
    let body = LambdaBody::ColExprs(cols.into_iter().map(|(n, e)| col_expr(n, e)).collect());
    let lambda = g.add_lambda(span(), vec![], body).unwrap();
    g.add_map(span(), parent, ArgMap::from([("fn", lambda)])).unwrap()
}

pub fn make_filter(g: &mut IrGraph, parent: NodeId, predicate: NodeId) -> NodeId {
    let lambda = g
        .add_lambda(span(), vec![], LambdaBody::Single(predicate))
        .unwrap();
    g.add_filter(span(), parent, ArgMap::from([("fn", lambda)]))
        .unwrap()
}

pub fn make_limit(g: &mut IrGraph, parent: NodeId, rows: i64) -> NodeId {
    let rows = make_int(g, rows);
    g.add_limit(span(), parent, ArgMap::from([("rows", rows)]))
        .unwrap()
}

pub fn make_mem_sink(g: &mut IrGraph, parent: NodeId, name: &str) -> NodeId {
    let name = make_string(g, name);
    g.add_memory_sink(span(), parent, ArgMap::from([("name", name)]))
        .unwrap()
}

pub fn make_blocking_agg(
    g: &mut IrGraph,
    parent: NodeId,
    groups: Vec<NodeId>,
    aggs: Vec<(&str, NodeId)>,
) -> NodeId {
    let by_body = if groups.len() == 1 {
        LambdaBody::Single(groups[0])
    } else {
        let list = g.add_list(span(), groups).unwrap();
        LambdaBody::Single(list)
    };
    let by = g.add_lambda(span(), vec![], by_body).unwrap();
    let fn_body = LambdaBody::ColExprs(aggs.into_iter().map(|(n, e)| col_expr(n, e)).collect());
    let agg_fn = g.add_lambda(span(), vec![], fn_body).unwrap();
    g.add_blocking_agg(span(), parent, ArgMap::from([("by", by), ("fn", agg_fn)]))
        .unwrap()
}

pub fn make_metadata_resolver(g: &mut IrGraph, parent: NodeId) -> NodeId {
    g.add_metadata_resolver(span(), parent, ArgMap::new())
        .unwrap()
}
