//! The IR graph: arena of nodes plus the operator dependency DAG.
//!
//! Nodes are owned by id in a sorted map; ids are allocated from a
//! per-graph counter and never reused, so deletion cannot recycle an id a
//! stale reference still names. The edge relation (`parent → children`)
//! is restricted to operator nodes and kept acyclic by construction:
//! every insertion runs a reachability check first.
//!
//! All iteration surfaces are deterministic (sorted by id; topological
//! order breaks ties by ascending id) because lowered plans are compared
//! byte-for-byte downstream.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use rowan::TextRange;

use crate::errors::{Error, Result};
use crate::node::{IrNode, NodeKind, Operator};

/// Graph-scoped node identity.
pub type NodeId = u64;

/// Default node cap per graph; configurable via [`IrGraph::with_node_cap`].
pub const DEFAULT_NODE_CAP: usize = 65_536;

#[derive(Debug)]
pub struct IrGraph {
    nodes: BTreeMap<NodeId, IrNode>,
    /// parent operator → child operators.
    edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
    next_id: NodeId,
    node_cap: Option<usize>,
}

impl Default for IrGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl IrGraph {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_id: 0,
            node_cap: Some(DEFAULT_NODE_CAP),
        }
    }

    /// Set the node cap. `None` = unlimited.
    pub fn with_node_cap(mut self, limit: Option<usize>) -> Self {
        self.node_cap = limit;
        self
    }

    pub fn node_cap(&self) -> Option<usize> {
        self.node_cap
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&IrNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("node {id} is not in the graph")))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut IrNode> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("node {id} is not in the graph")))
    }

    pub fn operator(&self, id: NodeId) -> Result<&Operator> {
        self.node(id)?
            .as_operator()
            .ok_or_else(|| Error::InvalidArgument(format!("node {id} is not an operator")))
    }

    pub(crate) fn operator_mut(&mut self, id: NodeId) -> Result<&mut Operator> {
        self.node_mut(id)?
            .as_operator_mut()
            .ok_or_else(|| Error::InvalidArgument(format!("node {id} is not an operator")))
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &IrNode> {
        self.nodes.values()
    }

    /// Operator nodes in ascending id order.
    pub fn operators(&self) -> impl Iterator<Item = &IrNode> {
        self.nodes.values().filter(|n| n.is_operator())
    }

    /// Allocate a node. Fails with ResourceExhausted at the cap.
    pub(crate) fn alloc(&mut self, span: TextRange, kind: NodeKind) -> Result<NodeId> {
        if let Some(cap) = self.node_cap
            && self.nodes.len() >= cap
        {
            return Err(Error::ResourceExhausted(format!(
                "graph node cap of {cap} reached"
            )));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, IrNode::new(id, span, kind));
        Ok(id)
    }

    /// Raw edge insert, no validation. Callers check first.
    pub(crate) fn record_edge(&mut self, parent: NodeId, child: NodeId) {
        self.edges.entry(parent).or_default().insert(child);
    }

    /// Add a dependency edge between two operators.
    ///
    /// Rejects non-operators and any edge that would close a cycle.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.operator(parent)?;
        self.operator(child)?;
        if parent == child || self.reachable(child, parent) {
            return Err(Error::CycleDetected { parent, child });
        }
        self.record_edge(parent, child);
        Ok(())
    }

    pub fn has_edge(&self, parent: NodeId, child: NodeId) -> bool {
        self.edges
            .get(&parent)
            .is_some_and(|children| children.contains(&child))
    }

    /// All dependency edges as (parent, child) pairs, ascending.
    pub fn edge_list(&self) -> Vec<(NodeId, NodeId)> {
        self.edges
            .iter()
            .flat_map(|(&p, children)| children.iter().map(move |&c| (p, c)))
            .collect()
    }

    /// Children of `parent` in ascending id order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.edges
            .get(&parent)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True if `to` is reachable from `from` along dependency edges.
    fn reachable(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(children) = self.edges.get(&id) {
                stack.extend(children.iter().copied());
            }
        }
        false
    }

    /// Operators ordered so every operator appears after all its parents.
    ///
    /// Ties among independent subgraphs break by ascending id, so the
    /// order is reproducible across runs.
    pub fn topological_sort(&self) -> Vec<NodeId> {
        let mut in_degree: BTreeMap<NodeId, usize> =
            self.operators().map(|n| (n.id(), 0)).collect();
        for children in self.edges.values() {
            for child in children {
                if let Some(d) = in_degree.get_mut(child) {
                    *d += 1;
                }
            }
        }

        let mut ready: BinaryHeap<std::cmp::Reverse<NodeId>> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| std::cmp::Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(std::cmp::Reverse(id)) = ready.pop() {
            order.push(id);
            if let Some(children) = self.edges.get(&id) {
                for &child in children {
                    if let Some(d) = in_degree.get_mut(&child) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push(std::cmp::Reverse(child));
                        }
                    }
                }
            }
        }
        debug_assert_eq!(order.len(), in_degree.len(), "dependency edges form a cycle");
        order
    }

    /// Rewrite one parent slot of `op` from `old_parent` to `new_parent`.
    ///
    /// Expressions that address "parent at index k" keep their stored
    /// index and resolve against `new_parent` on next lookup.
    pub fn replace_parent(
        &mut self,
        op: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
    ) -> Result<()> {
        self.operator(new_parent)?;
        let parents = &self.operator(op)?.parents;
        let pos = parents
            .iter()
            .position(|&p| p == old_parent)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("operator {op} has no parent {old_parent}"))
            })?;
        let old_count = parents.iter().filter(|&&p| p == old_parent).count();
        if op == new_parent || self.reachable(op, new_parent) {
            return Err(Error::CycleDetected {
                parent: new_parent,
                child: op,
            });
        }

        self.operator_mut(op)?.parents[pos] = new_parent;
        // Keep the old edge if another slot still names old_parent.
        if old_count == 1
            && let Some(children) = self.edges.get_mut(&old_parent)
        {
            children.remove(&op);
        }
        self.record_edge(new_parent, op);
        Ok(())
    }

    /// Delete a node with no live dependents.
    ///
    /// Fails with InvalidArgument while any other node still references
    /// the target (a parent slot, an owned expression, a resolver link).
    /// Containing-operator stamps are back-references and do not block;
    /// deletion is safe bottom-up.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        if let Some(holder) = self
            .nodes
            .values()
            .find(|n| n.id() != id && n.references(id))
        {
            return Err(Error::InvalidArgument(format!(
                "cannot delete node {id}: still referenced by node {}",
                holder.id()
            )));
        }
        self.nodes.remove(&id);
        self.edges.remove(&id);
        for children in self.edges.values_mut() {
            children.remove(&id);
        }
        Ok(())
    }

    /// Operator the expression's tree is attached to.
    pub fn containing_operator(&self, expr: NodeId) -> Result<NodeId> {
        let column = self
            .node(expr)?
            .as_expr()
            .and_then(|e| e.as_column())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("node {expr} is not a column-like expression"))
            })?;
        column.containing_op.ok_or_else(|| {
            Error::Unresolved(format!(
                "column '{}' is not attached to an operator",
                column.name
            ))
        })
    }

    /// Id of the operator a column-like expression references: the parent
    /// at the expression's stored index, looked up at call time.
    pub fn column_reference(&self, expr: NodeId) -> Result<NodeId> {
        let containing = self.containing_operator(expr)?;
        let column = self
            .node(expr)?
            .as_expr()
            .and_then(|e| e.as_column())
            .expect("containing_operator verified column-like");
        let parents = &self.operator(containing)?.parents;
        parents
            .get(column.parent_op_idx)
            .copied()
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "column '{}' addresses parent index {} but operator {containing} has {} parent(s)",
                    column.name,
                    column.parent_op_idx,
                    parents.len()
                ))
            })
    }

    /// The operator node a column-like expression references.
    pub fn referenced_operator(&self, expr: NodeId) -> Result<&IrNode> {
        let id = self.column_reference(expr)?;
        self.node(id)
    }
}
