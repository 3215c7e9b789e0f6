//! Named-argument initialization protocol for operators.
//!
//! Every operator is constructed from an `ArgMap`: a transient mapping
//! from argument name to expression node. The recognized names are fixed
//! per operator variant; a missing required name or a leftover
//! unrecognized name fails the construction, not a later pass.

use indexmap::IndexMap;

use crate::errors::{Error, Result};
use crate::graph::NodeId;

#[derive(Debug, Clone, Default)]
pub struct ArgMap {
    entries: IndexMap<String, NodeId>,
}

impl ArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an argument, replacing any previous binding of the name.
    pub fn insert(&mut self, name: impl Into<String>, node: NodeId) {
        self.entries.insert(name.into(), node);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return an optional argument.
    pub fn take(&mut self, name: &str) -> Option<NodeId> {
        self.entries.shift_remove(name)
    }

    /// Remove and return a required argument.
    pub fn take_required(&mut self, name: &str) -> Result<NodeId> {
        self.take(name)
            .ok_or_else(|| Error::InvalidArgument(format!("missing required argument '{name}'")))
    }

    /// Fail if any unrecognized arguments remain.
    pub fn expect_consumed(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let leftover: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        Err(Error::InvalidArgument(format!(
            "unrecognized argument(s): {}",
            leftover.join(", ")
        )))
    }
}

impl<N: Into<String>, const K: usize> From<[(N, NodeId); K]> for ArgMap {
    fn from(entries: [(N, NodeId); K]) -> Self {
        let mut map = ArgMap::new();
        for (name, node) in entries {
            map.insert(name, node);
        }
        map
    }
}

impl<N: Into<String>> FromIterator<(N, NodeId)> for ArgMap {
    fn from_iter<T: IntoIterator<Item = (N, NodeId)>>(iter: T) -> Self {
        let mut map = ArgMap::new();
        for (name, node) in iter {
            map.insert(name, node);
        }
        map
    }
}
