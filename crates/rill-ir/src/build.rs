//! Node constructors and the operator initialization protocol.
//!
//! Construction is single-step: each `add_*` allocates and validates in
//! one fallible call, so a half-initialized node never exists in the
//! graph. Operators are built from an optional parent plus an [`ArgMap`]
//! of named expression arguments; the recognized names are fixed per
//! variant and violations fail here, not in a later pass.
//!
//! Attaching an expression tree to an operator stamps every column-like
//! node in it with the owning operator, which is what positional parent
//! references resolve against.

use rowan::TextRange;

use crate::argmap::ArgMap;
use crate::errors::{Error, Result};
use crate::graph::{IrGraph, NodeId};
use crate::node::{
    BlockingAgg, ColExpr, Column, Expr, Filter, Func, FuncOp, Lambda, LambdaBody, Limit, List,
    Literal, Map, MemorySink, MemorySource, Metadata, MetadataLiteral, MetadataResolver, NodeKind,
    OpKind, Operator, Range, TimeRange,
};
use crate::types::{DataType, Relation};

impl IrGraph {
    // ── Literals ──────────────────────────────────────────────────────────

    pub fn add_int(&mut self, span: TextRange, value: i64) -> Result<NodeId> {
        self.alloc(span, NodeKind::Expr(Expr::Literal(Literal::Int(value))))
    }

    pub fn add_string(&mut self, span: TextRange, value: impl Into<String>) -> Result<NodeId> {
        self.alloc(
            span,
            NodeKind::Expr(Expr::Literal(Literal::String(value.into()))),
        )
    }

    pub fn add_float(&mut self, span: TextRange, value: f64) -> Result<NodeId> {
        self.alloc(span, NodeKind::Expr(Expr::Literal(Literal::Float(value))))
    }

    pub fn add_bool(&mut self, span: TextRange, value: bool) -> Result<NodeId> {
        self.alloc(span, NodeKind::Expr(Expr::Literal(Literal::Bool(value))))
    }

    // ── Structural expressions ────────────────────────────────────────────

    pub fn add_list(&mut self, span: TextRange, children: Vec<NodeId>) -> Result<NodeId> {
        for &child in &children {
            self.expr(child)?;
        }
        self.alloc(span, NodeKind::Expr(Expr::List(List { children })))
    }

    pub fn add_lambda(
        &mut self,
        span: TextRange,
        expected_columns: Vec<String>,
        body: LambdaBody,
    ) -> Result<NodeId> {
        match &body {
            LambdaBody::ColExprs(col_exprs) => {
                for ce in col_exprs {
                    self.expr(ce.expr)?;
                }
            }
            LambdaBody::Single(expr) => {
                self.expr(*expr)?;
            }
        }
        self.alloc(
            span,
            NodeKind::Expr(Expr::Lambda(Lambda {
                expected_columns,
                body,
            })),
        )
    }

    pub fn add_column(
        &mut self,
        span: TextRange,
        name: impl Into<String>,
        parent_op_idx: usize,
    ) -> Result<NodeId> {
        self.alloc(
            span,
            NodeKind::Expr(Expr::Column(Column {
                name: name.into(),
                parent_op_idx,
                resolved: None,
                containing_op: None,
            })),
        )
    }

    pub fn add_metadata(
        &mut self,
        span: TextRange,
        name: impl Into<String>,
        parent_op_idx: usize,
    ) -> Result<NodeId> {
        self.alloc(
            span,
            NodeKind::Expr(Expr::Metadata(Metadata {
                column: Column {
                    name: name.into(),
                    parent_op_idx,
                    resolved: None,
                    containing_op: None,
                },
                property: None,
                resolver: None,
            })),
        )
    }

    pub fn add_metadata_literal(&mut self, span: TextRange, literal: NodeId) -> Result<NodeId> {
        if self.expr(literal)?.as_literal().is_none() {
            return Err(Error::InvalidArgument(format!(
                "metadata literal must wrap a literal node, got {}",
                self.node(literal)?.tag()
            )));
        }
        self.alloc(
            span,
            NodeKind::Expr(Expr::MetadataLiteral(MetadataLiteral { literal })),
        )
    }

    pub fn add_func(
        &mut self,
        span: TextRange,
        op: FuncOp,
        prefix: impl Into<String>,
        args: Vec<NodeId>,
        compile_time: bool,
    ) -> Result<NodeId> {
        if let Some(arity) = op.opcode.arity()
            && args.len() != arity
        {
            return Err(Error::InvalidArgument(format!(
                "function '{}' takes {arity} argument(s), got {}",
                op.name,
                args.len()
            )));
        }
        for &arg in &args {
            self.expr(arg)?;
        }
        self.alloc(
            span,
            NodeKind::Expr(Expr::Func(Func {
                op,
                prefix: prefix.into(),
                args,
                compile_time,
                func_id: 0,
                evaluated_type: None,
            })),
        )
    }

    // ── Operators ─────────────────────────────────────────────────────────

    /// Source over a named table with a `select` column list.
    pub fn add_memory_source(
        &mut self,
        span: TextRange,
        parent: Option<NodeId>,
        mut args: ArgMap,
    ) -> Result<NodeId> {
        if let Some(parent) = parent {
            return Err(Error::InvalidArgument(format!(
                "memory source takes no parent, got {parent}"
            )));
        }
        let table = args.take_required("table")?;
        let select = args.take_required("select")?;
        args.expect_consumed()?;

        let table = self.string_arg("table", table)?.to_string();
        let mut column_names = Vec::new();
        for child in self.list_arg("select", select)? {
            column_names.push(self.string_arg("select", child)?.to_string());
        }
        self.finish_operator(
            span,
            vec![],
            OpKind::MemorySource(MemorySource {
                table,
                column_names,
                columns: vec![],
                columns_set: false,
                time_range: None,
            }),
        )
    }

    /// Sink writing its input to a named output table.
    pub fn add_memory_sink(
        &mut self,
        span: TextRange,
        parent: NodeId,
        mut args: ArgMap,
    ) -> Result<NodeId> {
        let name = args.take_required("name")?;
        args.expect_consumed()?;
        let name = self.string_arg("name", name)?.to_string();
        self.finish_operator(span, vec![parent], OpKind::MemorySink(MemorySink { name }))
    }

    /// Time-window placeholder over its parent; folded into the source
    /// before lowering.
    pub fn add_range(
        &mut self,
        span: TextRange,
        parent: NodeId,
        mut args: ArgMap,
    ) -> Result<NodeId> {
        let start = args.take_required("start")?;
        let stop = args.take_required("stop")?;
        args.expect_consumed()?;
        self.check_attachable(start, None)?;
        self.check_attachable(stop, None)?;
        let op = self.finish_operator(span, vec![parent], OpKind::Range(Range { start, stop }))?;
        self.attach_expr(start, op)?;
        self.attach_expr(stop, op)?;
        Ok(op)
    }

    /// Projection: one expression per output column, from a dict-body
    /// lambda bound to `fn`.
    pub fn add_map(&mut self, span: TextRange, parent: NodeId, mut args: ArgMap) -> Result<NodeId> {
        let lambda = args.take_required("fn")?;
        args.expect_consumed()?;
        let lambda = self.lambda_arg("fn", lambda)?;
        let LambdaBody::ColExprs(col_exprs) = lambda.body else {
            return Err(Error::InvalidArgument(
                "map 'fn' lambda must have named output bindings".to_string(),
            ));
        };
        for ce in &col_exprs {
            self.check_attachable(ce.expr, None)?;
        }
        let op = self.finish_operator(
            span,
            vec![parent],
            OpKind::Map(Map {
                col_exprs: col_exprs.clone(),
            }),
        )?;
        for ce in &col_exprs {
            self.attach_expr(ce.expr, op)?;
        }
        Ok(op)
    }

    /// Row filter from a single-expression lambda bound to `fn`.
    pub fn add_filter(
        &mut self,
        span: TextRange,
        parent: NodeId,
        mut args: ArgMap,
    ) -> Result<NodeId> {
        let lambda = args.take_required("fn")?;
        args.expect_consumed()?;
        let lambda = self.lambda_arg("fn", lambda)?;
        let LambdaBody::Single(expr) = lambda.body else {
            return Err(Error::InvalidArgument(
                "filter 'fn' lambda must have a single predicate expression".to_string(),
            ));
        };
        self.check_attachable(expr, None)?;
        let op = self.finish_operator(span, vec![parent], OpKind::Filter(Filter { expr }))?;
        self.attach_expr(expr, op)?;
        Ok(op)
    }

    /// Row-count limit from an integer bound to `rows`.
    pub fn add_limit(
        &mut self,
        span: TextRange,
        parent: NodeId,
        mut args: ArgMap,
    ) -> Result<NodeId> {
        let rows = args.take_required("rows")?;
        args.expect_consumed()?;
        let rows = self.int_arg("rows", rows)?;
        self.finish_operator(span, vec![parent], OpKind::Limit(Limit { rows }))
    }

    /// Blocking aggregate: value expressions from the dict-body lambda
    /// bound to `fn`, group-by columns from the single-body lambda bound
    /// to `by` (one column or a list of columns).
    pub fn add_blocking_agg(
        &mut self,
        span: TextRange,
        parent: NodeId,
        mut args: ArgMap,
    ) -> Result<NodeId> {
        let by = args.take_required("by")?;
        let agg_fn = args.take_required("fn")?;
        args.expect_consumed()?;

        let by = self.lambda_arg("by", by)?;
        let LambdaBody::Single(by_expr) = by.body else {
            return Err(Error::InvalidArgument(
                "agg 'by' lambda must have a single expression".to_string(),
            ));
        };
        let groups = self.group_columns(by_expr)?;

        let agg_fn = self.lambda_arg("fn", agg_fn)?;
        let LambdaBody::ColExprs(agg_exprs) = agg_fn.body else {
            return Err(Error::InvalidArgument(
                "agg 'fn' lambda must have named output bindings".to_string(),
            ));
        };
        for ce in &agg_exprs {
            self.check_attachable(ce.expr, None)?;
        }
        for &group in &groups {
            self.check_attachable(group, None)?;
        }

        let op = self.finish_operator(
            span,
            vec![parent],
            OpKind::BlockingAgg(BlockingAgg {
                windowed: false,
                agg_exprs: agg_exprs.clone(),
                groups: groups.clone(),
            }),
        )?;
        for ce in &agg_exprs {
            self.attach_expr(ce.expr, op)?;
        }
        for &group in &groups {
            self.attach_expr(group, op)?;
        }
        Ok(op)
    }

    /// Metadata resolver; takes no arguments.
    pub fn add_metadata_resolver(
        &mut self,
        span: TextRange,
        parent: NodeId,
        args: ArgMap,
    ) -> Result<NodeId> {
        args.expect_consumed()?;
        self.finish_operator(
            span,
            vec![parent],
            OpKind::MetadataResolver(MetadataResolver::default()),
        )
    }

    // ── Post-init mutators (resolution products) ──────────────────────────

    /// Bind a source's resolved column nodes.
    pub fn set_columns(&mut self, op: NodeId, columns: Vec<NodeId>) -> Result<()> {
        for &col in &columns {
            if !self.expr(col)?.is_column_like() {
                return Err(Error::InvalidArgument(format!(
                    "source column {col} is not a column expression"
                )));
            }
            self.check_attachable(col, Some(op))?;
        }
        for &col in &columns {
            self.attach_expr(col, op)?;
        }
        let OpKind::MemorySource(src) = &mut self.operator_mut(op)?.kind else {
            return Err(Error::InvalidArgument(format!(
                "node {op} is not a memory source"
            )));
        };
        src.columns = columns;
        src.columns_set = true;
        Ok(())
    }

    /// Set a source's nanosecond time window.
    pub fn set_time(&mut self, op: NodeId, start_ns: i64, stop_ns: i64) -> Result<()> {
        let OpKind::MemorySource(src) = &mut self.operator_mut(op)?.kind else {
            return Err(Error::InvalidArgument(format!(
                "node {op} is not a memory source"
            )));
        };
        src.time_range = Some(TimeRange { start_ns, stop_ns });
        Ok(())
    }

    /// Attach a resolved output relation to any operator.
    pub fn set_relation(&mut self, op: NodeId, relation: Relation) -> Result<()> {
        self.operator_mut(op)?.relation = Some(relation);
        Ok(())
    }

    /// Mark an aggregate as windowed.
    pub fn set_windowed(&mut self, op: NodeId, windowed: bool) -> Result<()> {
        let OpKind::BlockingAgg(agg) = &mut self.operator_mut(op)?.kind else {
            return Err(Error::InvalidArgument(format!(
                "node {op} is not a blocking aggregate"
            )));
        };
        agg.windowed = windowed;
        Ok(())
    }

    /// Bind a column-like expression to a concrete index and type.
    pub fn resolve_column(&mut self, expr: NodeId, index: i64, data_type: DataType) -> Result<()> {
        let column = self
            .node_mut(expr)?
            .as_expr_mut()
            .and_then(|e| e.as_column_mut())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("node {expr} is not a column-like expression"))
            })?;
        column.resolve(index, data_type);
        Ok(())
    }

    /// Assign a function's executor registry id.
    pub fn set_func_id(&mut self, expr: NodeId, func_id: i64) -> Result<()> {
        self.func_mut(expr)?.func_id = func_id;
        Ok(())
    }

    /// Record a function's resolved output type.
    pub fn resolve_func_type(&mut self, expr: NodeId, data_type: DataType) -> Result<()> {
        self.func_mut(expr)?.evaluated_type = Some(data_type);
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────

    pub(crate) fn expr(&self, id: NodeId) -> Result<&Expr> {
        self.node(id)?
            .as_expr()
            .ok_or_else(|| Error::InvalidArgument(format!("node {id} is not an expression")))
    }

    fn func_mut(&mut self, id: NodeId) -> Result<&mut Func> {
        match self.node_mut(id)?.as_expr_mut() {
            Some(Expr::Func(func)) => Ok(func),
            _ => Err(Error::InvalidArgument(format!(
                "node {id} is not a function expression"
            ))),
        }
    }

    fn string_arg(&self, name: &str, id: NodeId) -> Result<&str> {
        self.expr(id)?
            .as_literal()
            .and_then(Literal::as_str)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("argument '{name}' must be a string literal"))
            })
    }

    fn int_arg(&self, name: &str, id: NodeId) -> Result<i64> {
        self.expr(id)?
            .as_literal()
            .and_then(Literal::as_int)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("argument '{name}' must be an integer literal"))
            })
    }

    fn list_arg(&self, name: &str, id: NodeId) -> Result<Vec<NodeId>> {
        match self.expr(id)? {
            Expr::List(list) => Ok(list.children.clone()),
            _ => Err(Error::InvalidArgument(format!(
                "argument '{name}' must be a list"
            ))),
        }
    }

    fn lambda_arg(&self, name: &str, id: NodeId) -> Result<Lambda> {
        match self.expr(id)? {
            Expr::Lambda(lambda) => Ok(lambda.clone()),
            _ => Err(Error::InvalidArgument(format!(
                "argument '{name}' must be a lambda"
            ))),
        }
    }

    /// Group-by argument: one column or a list of columns.
    fn group_columns(&self, by_expr: NodeId) -> Result<Vec<NodeId>> {
        let candidates = match self.expr(by_expr)? {
            Expr::List(list) => list.children.clone(),
            _ => vec![by_expr],
        };
        for &col in &candidates {
            if !self.expr(col)?.is_column_like() {
                return Err(Error::InvalidArgument(format!(
                    "group-by entry {col} is not a column expression"
                )));
            }
        }
        Ok(candidates)
    }

    /// Validate parents and register the operator with its edges.
    fn finish_operator(
        &mut self,
        span: TextRange,
        parents: Vec<NodeId>,
        kind: OpKind,
    ) -> Result<NodeId> {
        for &parent in &parents {
            self.operator(parent)?;
        }
        let id = self.alloc(span, NodeKind::Operator(Operator::new(parents.clone(), kind)))?;
        for parent in parents {
            self.record_edge(parent, id);
        }
        Ok(id)
    }

    /// Verify no column-like node of the tree is attached to an operator
    /// other than `owner` (`None` = must be unattached). Run before
    /// allocating an operator so a failed init leaves no trace.
    fn check_attachable(&self, expr: NodeId, owner: Option<NodeId>) -> Result<()> {
        let mut stack = vec![expr];
        while let Some(id) = stack.pop() {
            let attached = match self.expr(id)? {
                Expr::Column(column) => column.containing_op,
                Expr::Metadata(md) => md.column.containing_op,
                Expr::Literal(_) => None,
                Expr::MetadataLiteral(ml) => {
                    stack.push(ml.literal);
                    None
                }
                Expr::Func(func) => {
                    stack.extend(func.args.iter().copied());
                    None
                }
                Expr::List(list) => {
                    stack.extend(list.children.iter().copied());
                    None
                }
                Expr::Lambda(lambda) => {
                    match &lambda.body {
                        LambdaBody::ColExprs(col_exprs) => {
                            stack.extend(col_exprs.iter().map(|ce| ce.expr));
                        }
                        LambdaBody::Single(body) => stack.push(*body),
                    }
                    None
                }
            };
            if let Some(existing) = attached
                && Some(existing) != owner
            {
                return Err(Error::InvalidArgument(format!(
                    "expression {id} is already attached to operator {existing}"
                )));
            }
        }
        Ok(())
    }

    /// Stamp every column-like node of an expression tree with its owning
    /// operator. An expression may belong to at most one operator.
    pub(crate) fn attach_expr(&mut self, expr: NodeId, op: NodeId) -> Result<()> {
        let mut stack = vec![expr];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id)?;
            let Some(e) = node.as_expr_mut() else {
                return Err(Error::InvalidArgument(format!(
                    "node {id} is not an expression"
                )));
            };
            match e {
                Expr::Column(column) => stamp_owner(column, id, op)?,
                Expr::Metadata(md) => stamp_owner(&mut md.column, id, op)?,
                Expr::Literal(_) => {}
                Expr::MetadataLiteral(ml) => stack.push(ml.literal),
                Expr::Func(func) => stack.extend(func.args.iter().copied()),
                Expr::List(list) => stack.extend(list.children.iter().copied()),
                Expr::Lambda(lambda) => match &lambda.body {
                    LambdaBody::ColExprs(col_exprs) => {
                        stack.extend(col_exprs.iter().map(|ce| ce.expr));
                    }
                    LambdaBody::Single(body) => stack.push(*body),
                },
            }
        }
        Ok(())
    }
}

fn stamp_owner(column: &mut Column, id: NodeId, op: NodeId) -> Result<()> {
    match column.containing_op {
        Some(owner) if owner != op => Err(Error::InvalidArgument(format!(
            "expression {id} is already attached to operator {owner}"
        ))),
        _ => {
            column.containing_op = Some(op);
            Ok(())
        }
    }
}

/// Convenience for building dict lambda bodies.
pub fn col_expr(name: impl Into<String>, expr: NodeId) -> ColExpr {
    ColExpr {
        name: name.into(),
        expr,
    }
}
