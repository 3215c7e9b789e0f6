//! Lowering of resolved operators into the physical-plan wire format.
//!
//! Lowering is the terminal step: it assumes type and metadata resolution
//! already ran, and fails with `Unresolved` where they did not. Output
//! ordering follows declaration order everywhere — plans are compared
//! byte-for-byte downstream, so nothing here may iterate a non-
//! deterministic collection.

use rill_plan::{
    AggregateExpression, AggregateOp, ColumnReference, FilterOp, LimitOp, LiteralValue, MapOp,
    MemorySinkOp, MemorySourceOp, Operator as PlanOperator, ScalarExpression, ScalarFunc,
    ScalarValue, TimestampValue,
};

use crate::errors::{Error, Result};
use crate::graph::{IrGraph, NodeId};
use crate::node::{Expr, Literal, OpKind};

impl IrGraph {
    /// Lower a single operator to its wire message.
    pub fn operator_to_proto(&self, id: NodeId) -> Result<PlanOperator> {
        let operator = self.operator(id)?;
        match &operator.kind {
            OpKind::MemorySource(src) => {
                if !src.columns_set {
                    return Err(Error::Unresolved(format!(
                        "source '{}' has no resolved columns",
                        src.table
                    )));
                }
                let mut column_idxs = Vec::with_capacity(src.columns.len());
                let mut column_names = Vec::with_capacity(src.columns.len());
                let mut column_types = Vec::with_capacity(src.columns.len());
                for &col_id in &src.columns {
                    let column = self
                        .expr(col_id)?
                        .as_column()
                        .ok_or_else(|| {
                            Error::InvalidArgument(format!(
                                "source column {col_id} is not a column expression"
                            ))
                        })?;
                    let resolved = column.resolved.ok_or_else(|| {
                        Error::Unresolved(format!("column '{}' is not resolved", column.name))
                    })?;
                    column_idxs.push(resolved.index);
                    column_names.push(column.name.clone());
                    column_types.push(resolved.data_type);
                }
                Ok(PlanOperator::MemSourceOp(MemorySourceOp {
                    name: src.table.clone(),
                    column_idxs,
                    column_names,
                    column_types,
                    start_time: src
                        .time_range
                        .map(|t| TimestampValue { value: t.start_ns }),
                    stop_time: src.time_range.map(|t| TimestampValue { value: t.stop_ns }),
                }))
            }
            OpKind::MemorySink(sink) => {
                let relation = operator.relation().ok_or_else(|| {
                    Error::Unresolved(format!("sink '{}' has no resolved relation", sink.name))
                })?;
                Ok(PlanOperator::MemSinkOp(MemorySinkOp {
                    name: sink.name.clone(),
                    column_names: relation.column_names(),
                    column_types: relation.column_types(),
                }))
            }
            OpKind::Map(map) => {
                let mut column_names = Vec::with_capacity(map.col_exprs.len());
                let mut expressions = Vec::with_capacity(map.col_exprs.len());
                for ce in &map.col_exprs {
                    column_names.push(ce.name.clone());
                    expressions.push(self.lower_scalar(ce.expr)?);
                }
                Ok(PlanOperator::MapOp(MapOp {
                    column_names,
                    expressions,
                }))
            }
            OpKind::Filter(filter) => Ok(PlanOperator::FilterOp(FilterOp {
                expression: self.lower_scalar(filter.expr)?,
            })),
            OpKind::Limit(limit) => Ok(PlanOperator::LimitOp(LimitOp { limit: limit.rows })),
            OpKind::BlockingAgg(agg) => {
                let mut values = Vec::with_capacity(agg.agg_exprs.len());
                let mut value_names = Vec::with_capacity(agg.agg_exprs.len());
                for ce in &agg.agg_exprs {
                    values.push(self.lower_agg_value(ce.expr)?);
                    value_names.push(ce.name.clone());
                }
                let mut groups = Vec::with_capacity(agg.groups.len());
                let mut group_names = Vec::with_capacity(agg.groups.len());
                for &group in &agg.groups {
                    groups.push(self.lower_column_ref(group)?);
                    group_names.push(
                        self.expr(group)?
                            .as_column()
                            .expect("groups validated at init")
                            .name
                            .clone(),
                    );
                }
                Ok(PlanOperator::AggOp(AggregateOp {
                    windowed: agg.windowed,
                    values,
                    value_names,
                    groups,
                    group_names,
                }))
            }
            OpKind::Range(_) => Err(Error::Unresolved(format!(
                "range operator {id} must be folded into its source before lowering"
            ))),
            OpKind::MetadataResolver(_) => Err(Error::Unresolved(format!(
                "metadata resolver {id} must be rewritten before lowering"
            ))),
        }
    }

    /// Lower every operator, in topological order.
    pub fn lower_graph(&self) -> Result<Vec<PlanOperator>> {
        self.topological_sort()
            .into_iter()
            .map(|id| self.operator_to_proto(id))
            .collect()
    }

    fn lower_scalar(&self, id: NodeId) -> Result<ScalarExpression> {
        match self.expr(id)? {
            Expr::Literal(lit) => Ok(ScalarExpression::Constant(lower_literal(lit))),
            Expr::Column(_) => Ok(ScalarExpression::Column(self.lower_column_ref(id)?)),
            Expr::Metadata(md) => {
                if !md.has_metadata_resolver() {
                    return Err(Error::Unresolved(format!(
                        "metadata '{}' has no resolver",
                        md.name()
                    )));
                }
                Ok(ScalarExpression::Column(self.lower_column_ref(id)?))
            }
            Expr::MetadataLiteral(ml) => {
                let literal = self.expr(ml.literal)?.as_literal().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "metadata literal {id} does not wrap a literal node"
                    ))
                })?;
                Ok(ScalarExpression::Constant(lower_literal(literal)))
            }
            Expr::Func(func) => {
                if func.compile_time {
                    return Err(Error::Unresolved(format!(
                        "compile-time function '{}' must be evaluated before lowering",
                        func.qualified_name()
                    )));
                }
                let args = func
                    .args
                    .iter()
                    .map(|&arg| self.lower_scalar(arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ScalarExpression::Func(ScalarFunc {
                    id: func.func_id,
                    name: func.qualified_name(),
                    args,
                }))
            }
            Expr::List(_) | Expr::Lambda(_) => Err(Error::InvalidArgument(format!(
                "node {id} is not a scalar expression"
            ))),
        }
    }

    /// Aggregate values must be function expressions.
    fn lower_agg_value(&self, id: NodeId) -> Result<AggregateExpression> {
        let func = self.expr(id)?.as_func().ok_or_else(|| {
            Error::InvalidArgument(format!("aggregate value {id} is not a function expression"))
        })?;
        let args = func
            .args
            .iter()
            .map(|&arg| self.lower_scalar(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(AggregateExpression {
            name: func.qualified_name(),
            id: func.func_id,
            args,
        })
    }

    /// (referenced operator id, resolved column index) for a column-like
    /// expression.
    fn lower_column_ref(&self, id: NodeId) -> Result<ColumnReference> {
        let column = self.expr(id)?.as_column().ok_or_else(|| {
            Error::InvalidArgument(format!("node {id} is not a column-like expression"))
        })?;
        let resolved = column.resolved.ok_or_else(|| {
            Error::Unresolved(format!("column '{}' is not resolved", column.name))
        })?;
        let node = self.column_reference(id)?;
        Ok(ColumnReference {
            node,
            index: resolved.index,
        })
    }
}

fn lower_literal(literal: &Literal) -> ScalarValue {
    let value = match literal {
        Literal::Int(v) => LiteralValue::Int64Value(*v),
        Literal::String(v) => LiteralValue::StringValue(v.clone()),
        Literal::Float(v) => LiteralValue::Float64Value(*v),
        Literal::Bool(v) => LiteralValue::BoolValue(*v),
    };
    ScalarValue {
        data_type: literal.data_type(),
        value,
    }
}
