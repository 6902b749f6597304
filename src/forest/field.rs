//! Field-space queries

use super::RegionTreeForest;
use crate::error::ForestError;
use crate::types::{FieldID, FieldSpaceID};

impl RegionTreeForest {
    pub fn get_field_size(
        &self,
        field_space: FieldSpaceID,
        field: FieldID,
    ) -> Result<usize, ForestError> {
        let state = self.state.read();
        state
            .field_space(field_space)?
            .sizes
            .get(&field)
            .copied()
            .ok_or(ForestError::FieldNotFound { field_space, field })
    }

    /// Fields in allocation order.
    pub fn get_field_space_fields(
        &self,
        field_space: FieldSpaceID,
    ) -> Result<Vec<FieldID>, ForestError> {
        let state = self.state.read();
        Ok(state.field_space(field_space)?.fields.clone())
    }
}
