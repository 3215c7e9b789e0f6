//! Binary serialization for plan operators using postcard.

use crate::json::PlanError;
use crate::plan::Operator;

impl Operator {
    /// Deserialize an operator from the binary wire format.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, PlanError> {
        postcard::from_bytes(bytes).map_err(PlanError::Binary)
    }

    /// Serialize this operator to the binary wire format.
    pub fn to_binary(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("serialization should not fail")
    }
}
