use crate::argmap::ArgMap;
use crate::errors::Error;
use crate::graph::IrGraph;
use crate::node::LambdaBody;
use crate::test_utils::*;

#[test]
fn fresh_ids_are_sequential() {
    let mut g = IrGraph::new();
    assert_eq!(make_int(&mut g, 1), 0);
    assert_eq!(make_int(&mut g, 2), 1);
    assert_eq!(make_int(&mut g, 3), 2);
    assert_eq!(g.len(), 3);
}

#[test]
fn missing_node_is_not_found() {
    let g = IrGraph::new();
    assert!(matches!(g.node(42), Err(Error::NotFound(_))));
}

#[test]
fn edge_requires_operators() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let lit = make_int(&mut g, 1);
    assert!(matches!(
        g.add_edge(src, lit),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        g.add_edge(lit, src),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn cycle_rejected_on_reverse_edge() {
    let mut g = IrGraph::new();
    let a = make_mem_source(&mut g);
    let b = make_mem_source(&mut g);
    g.add_edge(a, b).unwrap();
    assert!(matches!(
        g.add_edge(b, a),
        Err(Error::CycleDetected { parent, child }) if parent == b && child == a
    ));
}

#[test]
fn self_edge_rejected() {
    let mut g = IrGraph::new();
    let a = make_mem_source(&mut g);
    assert!(matches!(g.add_edge(a, a), Err(Error::CycleDetected { .. })));
}

#[test]
fn longer_cycle_rejected() {
    let mut g = IrGraph::new();
    let a = make_mem_source(&mut g);
    let b = make_mem_source(&mut g);
    let c = make_mem_source(&mut g);
    g.add_edge(a, b).unwrap();
    g.add_edge(b, c).unwrap();
    assert!(matches!(g.add_edge(c, a), Err(Error::CycleDetected { .. })));
}

#[test]
fn duplicate_edge_is_idempotent() {
    let mut g = IrGraph::new();
    let a = make_mem_source(&mut g);
    let b = make_mem_source(&mut g);
    g.add_edge(a, b).unwrap();
    g.add_edge(a, b).unwrap();
    assert_eq!(g.children(a), vec![b]);
}

#[test]
fn topological_order_parents_first_ties_by_id() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let map = make_map(&mut g, src, vec![("c", col)]);
    let col2 = make_column(&mut g, "c", 0);
    let map2 = make_map(&mut g, map, vec![("c", col2)]);
    let sink = make_mem_sink(&mut g, map2, "out");
    // Independent subgraph allocated last sorts after the chain.
    let late_src = make_mem_source(&mut g);

    assert_eq!(g.topological_sort(), vec![src, map, map2, sink, late_src]);
    // Deterministic across repeated calls.
    assert_eq!(g.topological_sort(), g.topological_sort());
}

#[test]
fn replace_parent_retargets_positional_references() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col1 = make_column(&mut g, "test1", 0);
    let col2 = make_column(&mut g, "test2", 0);
    let col3 = make_column(&mut g, "test3", 0);
    let three = make_int(&mut g, 3);
    let add = make_add_func(&mut g, col3, three);
    let child_map = make_map(
        &mut g,
        src,
        vec![("out1", col1), ("out2", col2), ("out3", add)],
    );

    assert_eq!(g.column_reference(col1).unwrap(), src);
    assert_eq!(g.column_reference(col2).unwrap(), src);
    assert_eq!(g.column_reference(col3).unwrap(), src);

    // A map that copies the parent's columns; its columns are distinct.
    let c1 = make_column(&mut g, "test1", 0);
    let c2 = make_column(&mut g, "test2", 0);
    let c3 = make_column(&mut g, "test3", 0);
    let parent_map = make_map(
        &mut g,
        src,
        vec![("test1", c1), ("test2", c2), ("test3", c3)],
    );
    assert_ne!(parent_map, child_map);

    g.replace_parent(child_map, src, parent_map).unwrap();
    assert_eq!(g.column_reference(col1).unwrap(), parent_map);
    assert_eq!(g.column_reference(col2).unwrap(), parent_map);
    assert_eq!(g.column_reference(col3).unwrap(), parent_map);
    assert_eq!(g.referenced_operator(col1).unwrap().id(), parent_map);

    // Stored indices did not change; only the parent slot did.
    for col in [col1, col2, col3] {
        let column = g.node(col).unwrap().as_expr().unwrap().as_column().unwrap();
        assert_eq!(column.parent_op_idx, 0);
    }
    assert_eq!(g.operator(child_map).unwrap().parents(), &[parent_map]);
    assert!(g.has_edge(parent_map, child_map));
    assert!(!g.has_edge(src, child_map));
}

#[test]
fn replace_parent_unknown_parent_errors() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let other = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let map = make_map(&mut g, src, vec![("c", col)]);
    assert!(matches!(
        g.replace_parent(map, other, src),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn replace_parent_rejects_cycle() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let a = make_map(&mut g, src, vec![("c", col)]);
    let col2 = make_column(&mut g, "c", 0);
    let b = make_map(&mut g, a, vec![("c", col2)]);
    // b is a descendant of a; making it a's parent would close a cycle.
    assert!(matches!(
        g.replace_parent(a, src, b),
        Err(Error::CycleDetected { .. })
    ));
}

#[test]
fn delete_unreferenced_node() {
    let mut g = IrGraph::new();
    let lit = make_int(&mut g, 7);
    g.delete_node(lit).unwrap();
    assert!(!g.contains(lit));
    assert!(matches!(g.delete_node(lit), Err(Error::NotFound(_))));
}

#[test]
fn delete_blocked_by_live_dependents() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let map = make_map(&mut g, src, vec![("c", col)]);

    // The map's parent slot still names the source.
    assert!(matches!(
        g.delete_node(src),
        Err(Error::InvalidArgument(_))
    ));
    // The map's payload still names the column.
    assert!(matches!(
        g.delete_node(col),
        Err(Error::InvalidArgument(_))
    ));
    let _ = map;
}

#[test]
fn bottom_up_deletion_succeeds() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    let col = make_column(&mut g, "c", 0);
    let lambda = g
        .add_lambda(span(), vec![], LambdaBody::ColExprs(vec![crate::col_expr("c", col)]))
        .unwrap();
    let map = g
        .add_map(span(), src, ArgMap::from([("fn", lambda)]))
        .unwrap();
    let sink = make_mem_sink(&mut g, map, "out");

    g.delete_node(sink).unwrap();
    g.delete_node(map).unwrap();
    g.delete_node(lambda).unwrap();
    g.delete_node(col).unwrap();
    g.delete_node(src).unwrap();
}

#[test]
fn delete_cleans_edges() {
    let mut g = IrGraph::new();
    let a = make_mem_source(&mut g);
    let b = make_mem_source(&mut g);
    g.add_edge(a, b).unwrap();
    g.delete_node(b).unwrap();
    assert!(g.children(a).is_empty());
}

#[test]
fn node_cap_enforced() {
    let mut g = IrGraph::new().with_node_cap(Some(2));
    g.add_int(span(), 1).unwrap();
    g.add_int(span(), 2).unwrap();
    assert!(matches!(
        g.add_int(span(), 3),
        Err(Error::ResourceExhausted(_))
    ));
}

#[test]
fn column_reference_out_of_range() {
    let mut g = IrGraph::new();
    let src = make_mem_source(&mut g);
    // Addresses parent index 1, but a map has exactly one parent.
    let col = make_column(&mut g, "c", 1);
    let _map = make_map(&mut g, src, vec![("c", col)]);
    assert!(matches!(
        g.column_reference(col),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn unattached_column_reference_is_unresolved() {
    let mut g = IrGraph::new();
    let col = make_column(&mut g, "c", 0);
    assert!(matches!(
        g.column_reference(col),
        Err(Error::Unresolved(_))
    ));
}
