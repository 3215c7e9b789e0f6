use crate::argmap::ArgMap;
use crate::errors::Error;
use crate::graph::IrGraph;
use crate::node::{Expr, LambdaBody, OpKind};
use crate::test_utils::*;
use crate::types::{DataType, Relation};

#[test]
fn check_connection() {
    let mut g = IrGraph::new();
    let start = make_int(&mut g, 0);
    let stop = make_int(&mut g, 10);
    let table = make_string(&mut g, "tableName");
    let select_col = make_string(&mut g, "testCol");
    let select = g.add_list(span(), vec![select_col]).unwrap();
    let src = g
        .add_memory_source(
            span(),
            None,
            ArgMap::from([("table", table), ("select", select)]),
        )
        .unwrap();
    let range = g
        .add_range(span(), src, ArgMap::from([("start", start), ("stop", stop)]))
        .unwrap();

    assert_eq!(g.operator(range).unwrap().parents(), &[src]);
    let OpKind::Range(r) = &g.operator(range).unwrap().kind else {
        panic!("expected range");
    };
    assert_eq!(r.start_repr(), start);
    assert_eq!(r.stop_repr(), stop);

    let OpKind::MemorySource(s) = &g.operator(src).unwrap().kind else {
        panic!("expected memory source");
    };
    assert_eq!(s.table_name(), "tableName");
    assert_eq!(s.column_names, vec!["testCol".to_string()]);

    let Some(Expr::List(list)) = g.node(select).unwrap().as_expr() else {
        panic!("expected list");
    };
    assert_eq!(list.children, vec![select_col]);
    assert_eq!(
        g.node(select_col)
            .unwrap()
            .as_expr()
            .unwrap()
            .as_literal()
            .unwrap()
            .as_str(),
        Some("testCol")
    );
    assert!(g.has_edge(src, range));
}

#[test]
fn missing_required_argument_fails_init() {
    let mut g = IrGraph::new();
    let table = make_string(&mut g, "t");
    let err = g
        .add_memory_source(span(), None, ArgMap::from([("table", table)]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("select")));
}

#[test]
fn unrecognized_argument_fails_init() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let rows = make_int(&mut g, 10);
    let extra = make_int(&mut g, 1);
    let err = g
        .add_limit(
            span(),
            src,
            ArgMap::from([("rows", rows), ("bogus", extra)]),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("bogus")));
}

#[test]
fn argument_kind_is_validated() {
    let mut g = IrGraph::new();
    let not_a_string = make_int(&mut g, 3);
    let select_col = make_string(&mut g, "c");
    let select = g.add_list(span(), vec![select_col]).unwrap();
    assert!(matches!(
        g.add_memory_source(
            span(),
            None,
            ArgMap::from([("table", not_a_string), ("select", select)]),
        ),
        Err(Error::InvalidArgument(_))
    ));

    let src = make_mem_source(&mut g);
    let not_an_int = make_string(&mut g, "ten");
    assert!(matches!(
        g.add_limit(span(), src, ArgMap::from([("rows", not_an_int)])),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn memory_source_takes_no_parent() {
    let mut g = IrGraph::new();
    let other = make_mem_source(&mut g);
    let table = make_string(&mut g, "t");
    let select = g.add_list(span(), vec![]).unwrap();
    assert!(matches!(
        g.add_memory_source(
            span(),
            Some(other),
            ArgMap::from([("table", table), ("select", select)]),
        ),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn map_requires_dict_body_lambda() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let lambda = g
        .add_lambda(span(), vec![], LambdaBody::Single(col))
        .unwrap();
    assert!(matches!(
        g.add_map(span(), src, ArgMap::from([("fn", lambda)])),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn filter_requires_single_body_lambda() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let lambda = g
        .add_lambda(
            span(),
            vec![],
            LambdaBody::ColExprs(vec![crate::col_expr("c", col)]),
        )
        .unwrap();
    assert!(matches!(
        g.add_filter(span(), src, ArgMap::from([("fn", lambda)])),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn func_arity_is_checked() {
    let mut g = IrGraph::new();
    let one = make_int(&mut g, 1);
    let err = g
        .add_func(
            span(),
            crate::FuncOp::new(crate::Opcode::Add, "+", "add"),
            crate::RUNTIME_FUNC_PREFIX,
            vec![one],
            false,
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("add")));
}

#[test]
fn named_funcs_have_free_arity() {
    let mut g = IrGraph::new();
    let a = make_int(&mut g, 1);
    let b = make_int(&mut g, 2);
    let c = make_int(&mut g, 3);
    g.add_func(
        span(),
        crate::FuncOp::new(crate::Opcode::NonOp, "", "greatest"),
        crate::RUNTIME_FUNC_PREFIX,
        vec![a, b, c],
        false,
    )
    .unwrap();
}

#[test]
fn agg_group_must_be_column() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let not_a_column = make_int(&mut g, 1);
    let by = g
        .add_lambda(span(), vec![], LambdaBody::Single(not_a_column))
        .unwrap();
    let value = make_column(&mut g, "v", 0);
    let mean = make_mean_func(&mut g, value);
    let agg_fn = g
        .add_lambda(
            span(),
            vec![],
            LambdaBody::ColExprs(vec![crate::col_expr("mean", mean)]),
        )
        .unwrap();
    assert!(matches!(
        g.add_blocking_agg(span(), src, ArgMap::from([("by", by), ("fn", agg_fn)])),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn expression_belongs_to_one_operator() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let _first = make_map(&mut g, src, vec![("c", col)]);

    let lambda = g
        .add_lambda(
            span(),
            vec![],
            LambdaBody::ColExprs(vec![crate::col_expr("c", col)]),
        )
        .unwrap();
    assert!(matches!(
        g.add_map(span(), src, ArgMap::from([("fn", lambda)])),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn metadata_resolver_takes_no_arguments() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let stray = make_int(&mut g, 1);
    assert!(matches!(
        g.add_metadata_resolver(span(), src, ArgMap::from([("x", stray)])),
        Err(Error::InvalidArgument(_))
    ));
    make_metadata_resolver(&mut g, src);
}

#[test]
fn metadata_literal_wraps_literals_only() {
    let mut g = IrGraph::new();
    let col = make_column(&mut g, "c", 0);
    assert!(matches!(
        g.add_metadata_literal(span(), col),
        Err(Error::InvalidArgument(_))
    ));
    let lit = make_string(&mut g, "pl/test_service");
    make_metadata_literal(&mut g, lit);
}

#[test]
fn list_children_must_be_expressions() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    assert!(matches!(
        g.add_list(span(), vec![src]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn source_resolution_mutators() {
    let mut g = IrGraph::new();
    let src = make_mem_source_named(&mut g, "test_table", &["cpu0", "cpu1"]);
    let col0 = make_column(&mut g, "cpu0", 0);
    let col1 = make_column(&mut g, "cpu1", 0);
    g.resolve_column(col0, 0, DataType::Int64).unwrap();
    g.resolve_column(col1, 2, DataType::Float64).unwrap();
    g.set_columns(src, vec![col0, col1]).unwrap();
    g.set_time(src, 10, 20).unwrap();

    let OpKind::MemorySource(s) = &g.operator(src).unwrap().kind else {
        panic!("expected memory source");
    };
    assert!(s.columns_set);
    assert_eq!(s.columns, vec![col0, col1]);
    assert!(s.is_time_set());
    let column = g.node(col0).unwrap().as_expr().unwrap().as_column().unwrap();
    let resolved = column.resolved.unwrap();
    assert_eq!(resolved.index, 0);
    assert_eq!(resolved.data_type, DataType::Int64);
}

#[test]
fn relation_attaches_to_any_operator() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let sink = make_mem_sink(&mut g, src, "out");
    assert!(!g.operator(sink).unwrap().has_relation());
    let relation = Relation::from_pairs([
        ("output1", DataType::Int64),
        ("output2", DataType::Float64),
    ]);
    g.set_relation(sink, relation.clone()).unwrap();
    assert_eq!(g.operator(sink).unwrap().relation(), Some(&relation));
}

#[test]
fn func_resolution_mutators() {
    let mut g = IrGraph::new();
    let a = make_int(&mut g, 1);
    let b = make_int(&mut g, 2);
    let func = make_add_func(&mut g, a, b);
    g.set_func_id(func, 7).unwrap();
    g.resolve_func_type(func, DataType::Int64).unwrap();
    let f = g.node(func).unwrap().as_expr().unwrap().as_func().unwrap();
    assert_eq!(f.func_id, 7);
    assert!(f.is_data_type_evaluated());
    assert_eq!(f.evaluated_type, Some(DataType::Int64));
    assert_eq!(f.qualified_name(), "pl.add");
}
