use crate::{CommandIndex, ComponentId, FieldMap};

/// Body of an entity command request, addressed to one command of one component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    pub component_id: ComponentId,
    pub command_index: CommandIndex,
    pub fields: FieldMap,
}

impl CommandRequest {
    pub fn new(component_id: ComponentId, command_index: CommandIndex) -> Self {
        Self {
            component_id,
            command_index,
            fields: FieldMap::new(),
        }
    }
}

/// Body of an entity command response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResponse {
    pub component_id: ComponentId,
    pub command_index: CommandIndex,
    pub fields: FieldMap,
}

impl CommandResponse {
    pub fn new(component_id: ComponentId, command_index: CommandIndex) -> Self {
        Self {
            component_id,
            command_index,
            fields: FieldMap::new(),
        }
    }
}
