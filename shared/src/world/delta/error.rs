use thiserror::Error;

use crate::{ComponentId, EntityId, OpType};

/// An op batch that contradicts the local view. The batch is rejected as a
/// whole and the view is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("op #{op_index}: entity {entity_id} added but it is already in the view")]
    EntityAlreadyExists { entity_id: EntityId, op_index: usize },

    #[error("op #{op_index} ({op_type}): entity {entity_id} is not in the view")]
    EntityNotFound {
        entity_id: EntityId,
        op_type: OpType,
        op_index: usize,
    },

    #[error("op #{op_index}: component {component_id} added to entity {entity_id} but it is already present")]
    ComponentAlreadyExists {
        entity_id: EntityId,
        component_id: ComponentId,
        op_index: usize,
    },

    #[error("op #{op_index} ({op_type}): component {component_id} is not present on entity {entity_id}")]
    ComponentNotFound {
        entity_id: EntityId,
        component_id: ComponentId,
        op_type: OpType,
        op_index: usize,
    },
}
