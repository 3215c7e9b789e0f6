//! Node model: one sum type over every IR variant.
//!
//! A node is identity (id + source span) plus a variant payload. Operators
//! are the DAG vertices (relational/stream steps); expressions are value
//! computations nested inside operators. Expressions reference the
//! operator they are relative to *positionally* — by index into the owning
//! operator's parent list — so swapping a parent re-targets every
//! descendant expression without rewriting it.

use std::sync::Arc;

use indexmap::IndexMap;
use rowan::TextRange;

use crate::errors::{Error, Result};
use crate::graph::NodeId;
use crate::metadata::MetadataProperty;
use crate::types::{DataType, Relation};

/// Namespace prefix for functions dispatched at run time.
pub const RUNTIME_FUNC_PREFIX: &str = "pl";

/// Discriminant tag identifying a node's concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
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

impl NodeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeTag::MemorySource => "MemorySource",
            NodeTag::MemorySink => "MemorySink",
            NodeTag::Range => "Range",
            NodeTag::Map => "Map",
            NodeTag::Filter => "Filter",
            NodeTag::Limit => "Limit",
            NodeTag::BlockingAgg => "BlockingAgg",
            NodeTag::MetadataResolver => "MetadataResolver",
            NodeTag::Column => "Column",
            NodeTag::Metadata => "Metadata",
            NodeTag::MetadataLiteral => "MetadataLiteral",
            NodeTag::Func => "Func",
            NodeTag::List => "List",
            NodeTag::Lambda => "Lambda",
            NodeTag::Int => "Int",
            NodeTag::String => "String",
            NodeTag::Float => "Float",
            NodeTag::Bool => "Bool",
        }
    }
}

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the IR graph. Never exists outside its owning graph.
#[derive(Debug, Clone)]
pub struct IrNode {
    id: NodeId,
    span: TextRange,
    kind: NodeKind,
}

impl IrNode {
    pub(crate) fn new(id: NodeId, span: TextRange, kind: NodeKind) -> Self {
        Self { id, span, kind }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Source position, opaque to the IR; carried for diagnostics only.
    pub fn span(&self) -> TextRange {
        self.span
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.kind, NodeKind::Operator(_))
    }

    pub fn is_expr(&self) -> bool {
        matches!(self.kind, NodeKind::Expr(_))
    }

    pub fn as_operator(&self) -> Option<&Operator> {
        match &self.kind {
            NodeKind::Operator(op) => Some(op),
            NodeKind::Expr(_) => None,
        }
    }

    pub(crate) fn as_operator_mut(&mut self) -> Option<&mut Operator> {
        match &mut self.kind {
            NodeKind::Operator(op) => Some(op),
            NodeKind::Expr(_) => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match &self.kind {
            NodeKind::Expr(expr) => Some(expr),
            NodeKind::Operator(_) => None,
        }
    }

    pub(crate) fn as_expr_mut(&mut self) -> Option<&mut Expr> {
        match &mut self.kind {
            NodeKind::Expr(expr) => Some(expr),
            NodeKind::Operator(_) => None,
        }
    }

    /// True if any payload field of this node references `target`.
    ///
    /// Containing-operator stamps are back-references and intentionally
    /// not counted; see `IrGraph::delete_node`.
    pub(crate) fn references(&self, target: NodeId) -> bool {
        match &self.kind {
            NodeKind::Operator(op) => {
                if op.parents.contains(&target) {
                    return true;
                }
                match &op.kind {
                    OpKind::MemorySource(src) => src.columns.contains(&target),
                    OpKind::MemorySink(_) | OpKind::Limit(_) | OpKind::MetadataResolver(_) => {
                        false
                    }
                    OpKind::Range(range) => range.start == target || range.stop == target,
                    OpKind::Map(map) => map.col_exprs.iter().any(|ce| ce.expr == target),
                    OpKind::Filter(filter) => filter.expr == target,
                    OpKind::BlockingAgg(agg) => {
                        agg.groups.contains(&target)
                            || agg.agg_exprs.iter().any(|ce| ce.expr == target)
                    }
                }
            }
            NodeKind::Expr(expr) => match expr {
                Expr::Column(_) | Expr::Literal(_) => false,
                Expr::Metadata(md) => md.resolver == Some(target),
                Expr::MetadataLiteral(ml) => ml.literal == target,
                Expr::Func(func) => func.args.contains(&target),
                Expr::List(list) => list.children.contains(&target),
                Expr::Lambda(lambda) => match &lambda.body {
                    LambdaBody::ColExprs(exprs) => exprs.iter().any(|ce| ce.expr == target),
                    LambdaBody::Single(expr) => *expr == target,
                },
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Operator(Operator),
    Expr(Expr),
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Operator(op) => op.kind.tag(),
            NodeKind::Expr(expr) => expr.tag(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

/// Common operator state plus the variant payload.
#[derive(Debug, Clone)]
pub struct Operator {
    /// Ordered parent operators. Expressions address these by index.
    pub(crate) parents: Vec<NodeId>,
    /// Resolved output relation, set by the type-resolution passes.
    pub(crate) relation: Option<Relation>,
    pub kind: OpKind,
}

impl Operator {
    pub(crate) fn new(parents: Vec<NodeId>, kind: OpKind) -> Self {
        Self {
            parents,
            relation: None,
            kind,
        }
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    pub fn has_relation(&self) -> bool {
        self.relation.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum OpKind {
    MemorySource(MemorySource),
    MemorySink(MemorySink),
    Range(Range),
    Map(Map),
    Filter(Filter),
    Limit(Limit),
    BlockingAgg(BlockingAgg),
    MetadataResolver(MetadataResolver),
}

impl OpKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            OpKind::MemorySource(_) => NodeTag::MemorySource,
            OpKind::MemorySink(_) => NodeTag::MemorySink,
            OpKind::Range(_) => NodeTag::Range,
            OpKind::Map(_) => NodeTag::Map,
            OpKind::Filter(_) => NodeTag::Filter,
            OpKind::Limit(_) => NodeTag::Limit,
            OpKind::BlockingAgg(_) => NodeTag::BlockingAgg,
            OpKind::MetadataResolver(_) => NodeTag::MetadataResolver,
        }
    }
}

/// An explicit nanosecond time window on a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ns: i64,
    pub stop_ns: i64,
}

#[derive(Debug, Clone)]
pub struct MemorySource {
    pub table: String,
    /// Selected column names, declaration order (from the `select` list).
    pub column_names: Vec<String>,
    /// Resolved column nodes, set by `set_columns`.
    pub columns: Vec<NodeId>,
    pub columns_set: bool,
    pub time_range: Option<TimeRange>,
}

impl MemorySource {
    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn is_time_set(&self) -> bool {
        self.time_range.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MemorySink {
    pub name: String,
}

/// A time-window placeholder folded into its source before lowering.
#[derive(Debug, Clone)]
pub struct Range {
    pub start: NodeId,
    pub stop: NodeId,
}

impl Range {
    pub fn start_repr(&self) -> NodeId {
        self.start
    }

    pub fn stop_repr(&self) -> NodeId {
        self.stop
    }
}

/// One named output column and the expression computing it.
#[derive(Debug, Clone)]
pub struct ColExpr {
    pub name: String,
    pub expr: NodeId,
}

#[derive(Debug, Clone)]
pub struct Map {
    pub col_exprs: Vec<ColExpr>,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub expr: NodeId,
}

#[derive(Debug, Clone)]
pub struct Limit {
    pub rows: i64,
}

#[derive(Debug, Clone)]
pub struct BlockingAgg {
    pub windowed: bool,
    pub agg_exprs: Vec<ColExpr>,
    /// Group-by columns, declaration order.
    pub groups: Vec<NodeId>,
}

/// Binds metadata names to concrete properties for descendant expressions.
#[derive(Debug, Clone, Default)]
pub struct MetadataResolver {
    columns: IndexMap<String, Arc<MetadataProperty>>,
}

impl MetadataResolver {
    pub fn has_metadata_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn add_metadata(&mut self, property: Arc<MetadataProperty>) -> Result<()> {
        let name = property.name().to_string();
        if self.has_metadata_column(&name) {
            return Err(Error::InvalidArgument(format!(
                "metadata column '{name}' already bound"
            )));
        }
        self.columns.insert(name, property);
        Ok(())
    }

    /// Bound columns in registration order.
    pub fn metadata_columns(&self) -> &IndexMap<String, Arc<MetadataProperty>> {
        &self.columns
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Column(Column),
    Metadata(Metadata),
    MetadataLiteral(MetadataLiteral),
    Func(Func),
    List(List),
    Lambda(Lambda),
    Literal(Literal),
}

impl Expr {
    pub fn tag(&self) -> NodeTag {
        match self {
            Expr::Column(_) => NodeTag::Column,
            Expr::Metadata(_) => NodeTag::Metadata,
            Expr::MetadataLiteral(_) => NodeTag::MetadataLiteral,
            Expr::Func(_) => NodeTag::Func,
            Expr::List(_) => NodeTag::List,
            Expr::Lambda(_) => NodeTag::Lambda,
            Expr::Literal(lit) => lit.tag(),
        }
    }

    /// True for plain columns and metadata references (which behave as
    /// columns once resolved).
    pub fn is_column_like(&self) -> bool {
        matches!(self, Expr::Column(_) | Expr::Metadata(_))
    }

    /// Column view of a column-like expression.
    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Expr::Column(col) => Some(col),
            Expr::Metadata(md) => Some(&md.column),
            _ => None,
        }
    }

    pub(crate) fn as_column_mut(&mut self) -> Option<&mut Column> {
        match self {
            Expr::Column(col) => Some(col),
            Expr::Metadata(md) => Some(&mut md.column),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Func> {
        match self {
            Expr::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

/// Binding of a column to its position in an ancestor's output relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: i64,
    pub data_type: DataType,
}

/// A column reference, unresolved by name until bound to an index + type.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// Index into the owning operator's parent list, not an id.
    pub parent_op_idx: usize,
    pub resolved: Option<ResolvedColumn>,
    /// Operator whose expression tree holds this column; stamped at attach.
    pub(crate) containing_op: Option<NodeId>,
}

impl Column {
    pub fn col_name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub(crate) fn resolve(&mut self, index: i64, data_type: DataType) {
        self.resolved = Some(ResolvedColumn { index, data_type });
    }
}

/// An unresolved reference to a named metadata attribute. Column-like:
/// resolution binds it to a property and, later, a concrete column.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub column: Column,
    pub property: Option<Arc<MetadataProperty>>,
    /// The resolver operator this reference was bound through.
    pub resolver: Option<NodeId>,
}

impl Metadata {
    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn has_metadata_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn property(&self) -> Option<&Arc<MetadataProperty>> {
        self.property.as_ref()
    }
}

/// A literal standing in for a metadata value (e.g. a pod name string).
#[derive(Debug, Clone)]
pub struct MetadataLiteral {
    pub literal: NodeId,
}

/// Function opcodes. Binary operators validate arity 2 at construction;
/// `NonOp` covers named functions with free arity (e.g. aggregates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    NonOp,
}

impl Opcode {
    /// Required argument count, if the opcode fixes one.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Opcode::NonOp => None,
            _ => Some(2),
        }
    }
}

/// The (opcode, operator symbol, canonical name) triple of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncOp {
    pub opcode: Opcode,
    /// Human-readable operator symbol, e.g. `+`; empty for named funcs.
    pub symbol: String,
    /// Canonical name, e.g. `add`.
    pub name: String,
}

impl FuncOp {
    pub fn new(opcode: Opcode, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            opcode,
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Func {
    pub op: FuncOp,
    /// Namespace prefix, e.g. [`RUNTIME_FUNC_PREFIX`].
    pub prefix: String,
    pub args: Vec<NodeId>,
    pub compile_time: bool,
    /// Executor registry id, assigned during function resolution.
    pub func_id: i64,
    /// Output type, assigned during type resolution.
    pub evaluated_type: Option<DataType>,
}

impl Func {
    pub fn func_name(&self) -> &str {
        &self.op.name
    }

    /// Fully qualified name as the executor sees it, e.g. `pl.add`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.prefix, self.op.name)
    }

    pub fn is_data_type_evaluated(&self) -> bool {
        self.evaluated_type.is_some()
    }
}

/// Ordered structural container of expressions.
#[derive(Debug, Clone)]
pub struct List {
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum LambdaBody {
    /// Dict body: named output bindings, declaration order.
    ColExprs(Vec<ColExpr>),
    /// Single-expression body (predicates, group-by specs).
    Single(NodeId),
}

/// An anonymous function literal used as an operator argument.
#[derive(Debug, Clone)]
pub struct Lambda {
    /// Declared parameter names the lambda captures.
    pub expected_columns: Vec<String>,
    pub body: LambdaBody,
}

impl Lambda {
    pub fn has_dict_body(&self) -> bool {
        matches!(self.body, LambdaBody::ColExprs(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    String(String),
    Float(f64),
    Bool(bool),
}

impl Literal {
    pub fn tag(&self) -> NodeTag {
        match self {
            Literal::Int(_) => NodeTag::Int,
            Literal::String(_) => NodeTag::String,
            Literal::Float(_) => NodeTag::Float,
            Literal::Bool(_) => NodeTag::Bool,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Int(_) => DataType::Int64,
            Literal::String(_) => DataType::String,
            Literal::Float(_) => DataType::Float64,
            Literal::Bool(_) => DataType::Boolean,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(v) => Some(v),
            _ => None,
        }
    }
}
