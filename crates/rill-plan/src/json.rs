//! JSON serialization for plan operators.
//!
//! The JSON view is the canonical human-readable form of a lowered plan:
//! externally-tagged enums, declaration field order. Golden comparisons
//! and debugging output both go through it.

use thiserror::Error;

use crate::plan::Operator;

/// Error decoding a plan operator.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary decode failed: {0}")]
    Binary(#[from] postcard::Error),
}

impl Operator {
    /// Parse an operator from its JSON view.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        serde_json::from_str(json).map_err(PlanError::Json)
    }

    /// Serialize this operator to its JSON view.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialization should not fail")
    }
}
