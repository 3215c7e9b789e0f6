//! Physical-plan message definitions.
//!
//! Field order within each message is wire-significant: the JSON view
//! serializes fields in declaration order, and plan equality in tests is
//! structural. Keep declaration order in sync with the execution engine.

use serde::{Deserialize, Serialize};

/// Column data types understood by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    String,
    #[serde(rename = "TIME64NS")]
    Time64Ns,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int64 => "INT64",
            DataType::Float64 => "FLOAT64",
            DataType::String => "STRING",
            DataType::Time64Ns => "TIME64NS",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator type tag.
///
/// Redundant with the `Operator` variant itself, but the engine keys its
/// dispatch tables on this string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    MemorySourceOperator,
    MemorySinkOperator,
    MapOperator,
    AggregateOperator,
    FilterOperator,
    LimitOperator,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::MemorySourceOperator => "MEMORY_SOURCE_OPERATOR",
            OpType::MemorySinkOperator => "MEMORY_SINK_OPERATOR",
            OpType::MapOperator => "MAP_OPERATOR",
            OpType::AggregateOperator => "AGGREGATE_OPERATOR",
            OpType::FilterOperator => "FILTER_OPERATOR",
            OpType::LimitOperator => "LIMIT_OPERATOR",
        }
    }
}

/// A lowered physical-plan operator: type tag plus one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    MemSourceOp(MemorySourceOp),
    MemSinkOp(MemorySinkOp),
    MapOp(MapOp),
    AggOp(AggregateOp),
    FilterOp(FilterOp),
    LimitOp(LimitOp),
}

impl Operator {
    pub fn op_type(&self) -> OpType {
        match self {
            Operator::MemSourceOp(_) => OpType::MemorySourceOperator,
            Operator::MemSinkOp(_) => OpType::MemorySinkOperator,
            Operator::MapOp(_) => OpType::MapOperator,
            Operator::AggOp(_) => OpType::AggregateOperator,
            Operator::FilterOp(_) => OpType::FilterOperator,
            Operator::LimitOp(_) => OpType::LimitOperator,
        }
    }
}

/// An explicit nanosecond time marker.
///
/// Wrapped rather than a bare i64 so that "unset" and "zero" stay
/// distinguishable in the wire view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampValue {
    pub value: i64,
}

/// Reads selected columns of a named in-memory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySourceOp {
    pub name: String,
    /// Indices into the source table's relation, declaration order.
    pub column_idxs: Vec<i64>,
    pub column_names: Vec<String>,
    pub column_types: Vec<DataType>,
    // Plain Options (no skip attributes): the binary encoding is not
    // self-describing, so the field layout must be identical either way.
    pub start_time: Option<TimestampValue>,
    pub stop_time: Option<TimestampValue>,
}

/// Writes its input to a named in-memory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySinkOp {
    pub name: String,
    pub column_names: Vec<String>,
    pub column_types: Vec<DataType>,
}

/// Computes one expression per output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOp {
    pub column_names: Vec<String>,
    /// Parallel to `column_names`.
    pub expressions: Vec<ScalarExpression>,
}

/// Grouped aggregation. `windowed` selects streaming-window semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOp {
    pub windowed: bool,
    /// Aggregate value expressions, parallel to `value_names`.
    pub values: Vec<AggregateExpression>,
    pub value_names: Vec<String>,
    /// Group-by columns, parallel to `group_names`.
    pub groups: Vec<ColumnReference>,
    pub group_names: Vec<String>,
}

/// Keeps rows for which the predicate evaluates to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOp {
    pub expression: ScalarExpression,
}

/// Truncates its input to the first `limit` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOp {
    pub limit: i64,
}

/// A scalar expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarExpression {
    Constant(ScalarValue),
    Func(ScalarFunc),
    Column(ColumnReference),
}

/// A typed literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarValue {
    pub data_type: DataType,
    pub value: LiteralValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Int64Value(i64),
    Float64Value(f64),
    StringValue(String),
    BoolValue(bool),
}

/// A scalar function call dispatched by registry id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFunc {
    /// Executor registry id of the implementation.
    pub id: i64,
    /// Fully qualified name, e.g. `pl.add`.
    pub name: String,
    pub args: Vec<ScalarExpression>,
}

/// A reference to a column produced by an upstream operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    /// Plan-graph id of the operator that produces the column.
    pub node: u64,
    /// Index into that operator's output relation.
    pub index: i64,
}

/// An aggregate value: a named, id-dispatched function over scalar args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpression {
    /// Fully qualified name, e.g. `pl.mean`.
    pub name: String,
    /// Executor registry id of the implementation.
    pub id: i64,
    pub args: Vec<ScalarExpression>,
}
