//! Relation types shared between the IR and the external catalog.
//!
//! A `Relation` is the resolved output shape of an operator: an ordered
//! list of (column name, data type) pairs. Relations originate in the
//! table catalog (an external collaborator) and are attached to operators
//! by the type-resolution passes.

use serde::{Deserialize, Serialize};

pub use rill_plan::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationColumn {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    columns: Vec<RelationColumn>,
}

impl Relation {
    pub fn new(columns: Vec<RelationColumn>) -> Self {
        Self { columns }
    }

    /// Build from parallel name/type lists, the catalog's native shape.
    pub fn from_pairs<N: Into<String>>(pairs: impl IntoIterator<Item = (N, DataType)>) -> Self {
        Self {
            columns: pairs
                .into_iter()
                .map(|(name, data_type)| RelationColumn {
                    name: name.into(),
                    data_type,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[RelationColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_types(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }
}
