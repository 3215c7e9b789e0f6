use crate::graph::IrGraph;
use crate::node::{FuncOp, NodeTag, Opcode};
use crate::test_utils::*;
use crate::types::{DataType, Relation};

#[test]
fn opcode_arity() {
    assert_eq!(Opcode::Add.arity(), Some(2));
    assert_eq!(Opcode::Eq.arity(), Some(2));
    assert_eq!(Opcode::And.arity(), Some(2));
    assert_eq!(Opcode::NonOp.arity(), None);
}

#[test]
fn func_qualified_name() {
    let mut g = IrGraph::new();
    let a = make_int(&mut g, 1);
    let b = make_int(&mut g, 2);
    let func = g
        .add_func(
            span(),
            FuncOp::new(Opcode::Add, "+", "add"),
            "pl",
            vec![a, b],
            false,
        )
        .unwrap();
    let f = g.node(func).unwrap().as_expr().unwrap().as_func().unwrap();
    assert_eq!(f.func_name(), "add");
    assert_eq!(f.qualified_name(), "pl.add");
    assert_eq!(f.op.symbol, "+");
    assert!(!f.is_data_type_evaluated());
}

#[test]
fn literal_data_types() {
    let mut g = IrGraph::new();
    let cases = [
        (make_int(&mut g, 1), DataType::Int64, NodeTag::Int),
        (make_string(&mut g, "x"), DataType::String, NodeTag::String),
        (
            g.add_float(span(), 1.5).unwrap(),
            DataType::Float64,
            NodeTag::Float,
        ),
        (
            g.add_bool(span(), true).unwrap(),
            DataType::Boolean,
            NodeTag::Bool,
        ),
    ];
    for (id, data_type, tag) in cases {
        let node = g.node(id).unwrap();
        assert_eq!(node.tag(), tag);
        assert_eq!(
            node.as_expr().unwrap().as_literal().unwrap().data_type(),
            data_type
        );
    }
}

#[test]
fn node_identity_accessors() {
    let mut g = IrGraph::new();
    let id = make_int(&mut g, 42);
    let node = g.node(id).unwrap();
    assert_eq!(node.id(), id);
    assert_eq!(node.span(), span());
    assert_eq!(node.tag().as_str(), "Int");
    assert!(node.is_expr());
    assert!(!node.is_operator());
}

#[test]
fn relation_lookup() {
    let relation = Relation::from_pairs([
        ("time_", DataType::Time64Ns),
        ("cpu0", DataType::Int64),
        ("cpu1", DataType::Float64),
    ]);
    assert_eq!(relation.len(), 3);
    assert!(!relation.is_empty());
    assert_eq!(relation.index_of("cpu1"), Some(2));
    assert_eq!(relation.index_of("nope"), None);
    assert_eq!(
        relation.column_names(),
        vec!["time_".to_string(), "cpu0".to_string(), "cpu1".to_string()]
    );
    assert_eq!(
        relation.column_types(),
        vec![DataType::Time64Ns, DataType::Int64, DataType::Float64]
    );
    assert_eq!(relation.columns()[1].name, "cpu0");
}

#[test]
fn tag_strings_are_stable() {
    assert_eq!(NodeTag::MemorySource.as_str(), "MemorySource");
    assert_eq!(NodeTag::BlockingAgg.as_str(), "BlockingAgg");
    assert_eq!(NodeTag::MetadataResolver.to_string(), "MetadataResolver");
}
