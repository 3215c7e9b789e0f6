//! Dump helpers for graph inspection and testing.
//!
//! One line per node in ascending id order; operators additionally show
//! their dependency children (`→ ∅` for leaves). The format is the
//! snapshot-test surface, so changes here ripple into expected outputs.

use std::fmt::Write;

use crate::graph::{IrGraph, NodeId};
use crate::node::{ColExpr, Expr, LambdaBody, Literal, NodeKind, OpKind};

impl IrGraph {
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for node in self.nodes() {
            let id = node.id();
            let _ = write!(out, "N{id}: ");
            match node.kind() {
                NodeKind::Operator(op) => {
                    format_operator(&mut out, &op.kind);
                    let children = self.children(id);
                    if children.is_empty() {
                        out.push_str(" → ∅");
                    } else {
                        let _ = write!(out, " → {}", id_list(&children));
                    }
                }
                NodeKind::Expr(expr) => format_expr(&mut out, expr),
            }
            out.push('\n');
        }
        out
    }
}

fn format_operator(w: &mut String, kind: &OpKind) {
    match kind {
        OpKind::MemorySource(src) => {
            let _ = write!(
                w,
                "MemorySource table={} select=[{}]",
                src.table,
                src.column_names.join(", ")
            );
            if let Some(t) = src.time_range {
                let _ = write!(w, " time={}..{}", t.start_ns, t.stop_ns);
            }
            if src.columns_set {
                let _ = write!(w, " cols=[{}]", id_list(&src.columns));
            }
        }
        OpKind::MemorySink(sink) => {
            let _ = write!(w, "MemorySink name={}", sink.name);
        }
        OpKind::Range(range) => {
            let _ = write!(w, "Range start=N{} stop=N{}", range.start, range.stop);
        }
        OpKind::Map(map) => {
            let _ = write!(w, "Map exprs=[{}]", col_expr_list(&map.col_exprs));
        }
        OpKind::Filter(filter) => {
            let _ = write!(w, "Filter expr=N{}", filter.expr);
        }
        OpKind::Limit(limit) => {
            let _ = write!(w, "Limit rows={}", limit.rows);
        }
        OpKind::BlockingAgg(agg) => {
            let _ = write!(
                w,
                "BlockingAgg groups=[{}] values=[{}]",
                id_list(&agg.groups),
                col_expr_list(&agg.agg_exprs)
            );
        }
        OpKind::MetadataResolver(resolver) => {
            let names: Vec<&str> = resolver
                .metadata_columns()
                .keys()
                .map(String::as_str)
                .collect();
            let _ = write!(w, "MetadataResolver cols=[{}]", names.join(", "));
        }
    }
}

fn format_expr(w: &mut String, expr: &Expr) {
    match expr {
        Expr::Column(col) => {
            let _ = write!(w, "Column {}@{}", col.name, col.parent_op_idx);
            if let Some(r) = col.resolved {
                let _ = write!(w, " [#{} {}]", r.index, r.data_type);
            }
        }
        Expr::Metadata(md) => {
            let _ = write!(w, "Metadata {}@{}", md.name(), md.column.parent_op_idx);
            if md.has_metadata_resolver() {
                let _ = write!(w, " [resolved]");
            }
        }
        Expr::MetadataLiteral(ml) => {
            let _ = write!(w, "MetadataLiteral N{}", ml.literal);
        }
        Expr::Func(func) => {
            let args: Vec<String> = func.args.iter().map(|a| format!("N{a}")).collect();
            let _ = write!(w, "Func {}({})", func.qualified_name(), args.join(", "));
        }
        Expr::List(list) => {
            let _ = write!(w, "List [{}]", id_list(&list.children));
        }
        Expr::Lambda(lambda) => {
            let _ = write!(w, "Lambda");
            if !lambda.expected_columns.is_empty() {
                let _ = write!(w, " ({})", lambda.expected_columns.join(", "));
            }
            match &lambda.body {
                LambdaBody::ColExprs(col_exprs) => {
                    let _ = write!(w, " {{{}}}", col_expr_list(col_exprs));
                }
                LambdaBody::Single(body) => {
                    let _ = write!(w, " N{body}");
                }
            }
        }
        Expr::Literal(lit) => {
            let _ = match lit {
                Literal::Int(v) => write!(w, "Int {v}"),
                Literal::String(v) => write!(w, "String \"{v}\""),
                Literal::Float(v) => write!(w, "Float {v}"),
                Literal::Bool(v) => write!(w, "Bool {v}"),
            };
        }
    }
}

fn id_list(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| format!("N{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn col_expr_list(col_exprs: &[ColExpr]) -> String {
    col_exprs
        .iter()
        .map(|ce| format!("{}=N{}", ce.name, ce.expr))
        .collect::<Vec<_>>()
        .join(", ")
}
