//! Metadata properties and their resolution against the IR graph.
//!
//! A [`MetadataHandler`] is an explicit registry of the known metadata
//! attributes (pod name, service id, …) with their derivation
//! dependencies; one is constructed per compilation rather than held as
//! process state so compilations stay independent. A metadata expression
//! resolves by finding a [`MetadataResolver`](crate::node::MetadataResolver)
//! operator among its ancestors and binding to a registered property.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::{Error, Result};
use crate::graph::{IrGraph, NodeId};
use crate::node::{Expr, OpKind};
use crate::types::DataType;

/// The known metadata attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataType {
    PodId,
    PodName,
    ServiceId,
    ServiceName,
    ContainerId,
    Namespace,
}

impl MetadataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataType::PodId => "pod_id",
            MetadataType::PodName => "pod_name",
            MetadataType::ServiceId => "service_id",
            MetadataType::ServiceName => "service_name",
            MetadataType::ContainerId => "container_id",
            MetadataType::Namespace => "namespace",
        }
    }
}

impl std::fmt::Display for MetadataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered metadata attribute: its type, the column type it
/// materializes as, and the metadata types it can be derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataProperty {
    md_type: MetadataType,
    column_type: DataType,
    derived_from: Vec<MetadataType>,
}

impl MetadataProperty {
    pub fn new(
        md_type: MetadataType,
        column_type: DataType,
        derived_from: Vec<MetadataType>,
    ) -> Self {
        Self {
            md_type,
            column_type,
            derived_from,
        }
    }

    pub fn name(&self) -> &'static str {
        self.md_type.as_str()
    }

    pub fn metadata_type(&self) -> MetadataType {
        self.md_type
    }

    pub fn column_type(&self) -> DataType {
        self.column_type
    }

    pub fn derived_from(&self) -> &[MetadataType] {
        &self.derived_from
    }

    pub fn can_derive_from(&self, source: MetadataType) -> bool {
        self.derived_from.contains(&source)
    }
}

/// Registry of metadata properties, keyed by attribute name.
#[derive(Debug, Clone, Default)]
pub struct MetadataHandler {
    properties: IndexMap<&'static str, Arc<MetadataProperty>>,
}

impl MetadataHandler {
    /// Registry populated with the fixed known attribute set.
    pub fn create() -> Self {
        use MetadataType::*;
        let mut handler = Self::default();
        let known = [
            MetadataProperty::new(PodId, DataType::String, vec![PodName]),
            MetadataProperty::new(PodName, DataType::String, vec![PodId]),
            MetadataProperty::new(ServiceId, DataType::String, vec![ServiceName, PodId]),
            MetadataProperty::new(ServiceName, DataType::String, vec![ServiceId, PodId]),
            MetadataProperty::new(ContainerId, DataType::String, vec![PodId]),
            MetadataProperty::new(Namespace, DataType::String, vec![PodId, PodName]),
        ];
        for property in known {
            handler
                .add_property(Arc::new(property))
                .expect("known set has no duplicates");
        }
        handler
    }

    pub fn add_property(&mut self, property: Arc<MetadataProperty>) -> Result<()> {
        let name = property.name();
        if self.properties.contains_key(name) {
            return Err(Error::InvalidArgument(format!(
                "metadata property '{name}' already registered"
            )));
        }
        self.properties.insert(name, property);
        Ok(())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Result<Arc<MetadataProperty>> {
        self.properties
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("metadata property '{name}' is not registered")))
    }
}

impl IrGraph {
    /// Nearest metadata resolver among an operator's ancestors.
    ///
    /// Walks parents breadth-first; fails with Unresolved when every
    /// ancestor path ends at a source without passing a resolver.
    pub fn find_metadata_resolver(&self, from_op: NodeId) -> Result<NodeId> {
        let mut queue: std::collections::VecDeque<NodeId> =
            self.operator(from_op)?.parents().iter().copied().collect();
        let mut seen = std::collections::BTreeSet::new();
        while let Some(op) = queue.pop_front() {
            if !seen.insert(op) {
                continue;
            }
            let operator = self.operator(op)?;
            if matches!(operator.kind, OpKind::MetadataResolver(_)) {
                return Ok(op);
            }
            queue.extend(operator.parents().iter().copied());
        }
        Err(Error::Unresolved(format!(
            "no metadata resolver reachable from operator {from_op}"
        )))
    }

    /// Bind a metadata expression to a resolver and property.
    ///
    /// Idempotent for the same resolver; re-resolution against a
    /// different resolver is a logic error and is rejected.
    pub fn resolve_metadata_column(
        &mut self,
        expr: NodeId,
        resolver: NodeId,
        property: Arc<MetadataProperty>,
    ) -> Result<()> {
        if !matches!(
            self.operator(resolver)?.kind,
            OpKind::MetadataResolver(_)
        ) {
            return Err(Error::InvalidArgument(format!(
                "node {resolver} is not a metadata resolver"
            )));
        }
        let md = match self.node_mut(expr)?.as_expr_mut() {
            Some(Expr::Metadata(md)) => md,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "node {expr} is not a metadata expression"
                )));
            }
        };
        if let Some(bound) = md.resolver
            && bound != resolver
        {
            return Err(Error::InvalidArgument(format!(
                "metadata '{}' already resolved against resolver {bound}",
                md.name()
            )));
        }
        md.property = Some(property);
        md.resolver = Some(resolver);
        Ok(())
    }
}
