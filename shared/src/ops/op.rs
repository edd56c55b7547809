use std::fmt;

use crate::{
    Authority, CommandRequest, CommandResponse, ComponentData, ComponentId, ComponentUpdate,
    EntityId, RequestId, StatusCode,
};

/// A single change received from the runtime. Ops arrive in batches and are
/// applied strictly in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    AddEntity {
        entity_id: EntityId,
    },
    RemoveEntity {
        entity_id: EntityId,
    },
    AddComponent {
        entity_id: EntityId,
        data: ComponentData,
    },
    RemoveComponent {
        entity_id: EntityId,
        component_id: ComponentId,
    },
    ComponentUpdate {
        entity_id: EntityId,
        update: ComponentUpdate,
    },
    /// Replaces the whole value of a Component that is already present.
    ComponentRefresh {
        entity_id: EntityId,
        data: ComponentData,
    },
    AuthorityChange {
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    },
    ReserveEntityIdsResponse(ReserveEntityIdsResponseOp),
    CreateEntityResponse(CreateEntityResponseOp),
    DeleteEntityResponse(DeleteEntityResponseOp),
    EntityQueryResponse(EntityQueryResponseOp),
    CommandResponse(CommandResponseOp),
    CommandRequest(CommandRequestOp),
    Disconnect(DisconnectOp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpType {
    AddEntity,
    RemoveEntity,
    AddComponent,
    RemoveComponent,
    ComponentUpdate,
    ComponentRefresh,
    AuthorityChange,
    ReserveEntityIdsResponse,
    CreateEntityResponse,
    DeleteEntityResponse,
    EntityQueryResponse,
    CommandResponse,
    CommandRequest,
    Disconnect,
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Op {
    pub fn op_type(&self) -> OpType {
        match self {
            Op::AddEntity { .. } => OpType::AddEntity,
            Op::RemoveEntity { .. } => OpType::RemoveEntity,
            Op::AddComponent { .. } => OpType::AddComponent,
            Op::RemoveComponent { .. } => OpType::RemoveComponent,
            Op::ComponentUpdate { .. } => OpType::ComponentUpdate,
            Op::ComponentRefresh { .. } => OpType::ComponentRefresh,
            Op::AuthorityChange { .. } => OpType::AuthorityChange,
            Op::ReserveEntityIdsResponse(_) => OpType::ReserveEntityIdsResponse,
            Op::CreateEntityResponse(_) => OpType::CreateEntityResponse,
            Op::DeleteEntityResponse(_) => OpType::DeleteEntityResponse,
            Op::EntityQueryResponse(_) => OpType::EntityQueryResponse,
            Op::CommandResponse(_) => OpType::CommandResponse,
            Op::CommandRequest(_) => OpType::CommandRequest,
            Op::Disconnect(_) => OpType::Disconnect,
        }
    }

    /// The entity an op targets, for entity and component ops.
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            Op::AddEntity { entity_id }
            | Op::RemoveEntity { entity_id }
            | Op::AddComponent { entity_id, .. }
            | Op::RemoveComponent { entity_id, .. }
            | Op::ComponentUpdate { entity_id, .. }
            | Op::ComponentRefresh { entity_id, .. }
            | Op::AuthorityChange { entity_id, .. } => Some(*entity_id),
            _ => None,
        }
    }

    /// True for ops that are passed through to the delta as worker messages
    /// rather than applied to the view.
    pub fn is_worker_message(&self) -> bool {
        matches!(
            self,
            Op::ReserveEntityIdsResponse(_)
                | Op::CreateEntityResponse(_)
                | Op::DeleteEntityResponse(_)
                | Op::EntityQueryResponse(_)
                | Op::CommandResponse(_)
                | Op::CommandRequest(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveEntityIdsResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub message: String,
    /// First id of a contiguous reserved range, present on success.
    pub first_entity_id: Option<EntityId>,
    pub number_of_entity_ids: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateEntityResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub message: String,
    pub entity_id: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteEntityResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub message: String,
    pub entity_id: EntityId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueriedEntity {
    pub entity_id: EntityId,
    pub components: Vec<ComponentData>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityQueryResponseOp {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub message: String,
    pub results: Vec<QueriedEntity>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResponseOp {
    pub request_id: RequestId,
    pub entity_id: EntityId,
    pub status: StatusCode,
    pub message: String,
    pub response: Option<CommandResponse>,
}

/// An entity command sent to this process by another worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequestOp {
    pub request_id: RequestId,
    pub entity_id: EntityId,
    pub request: CommandRequest,
    pub timeout_millis: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisconnectOp {
    pub status_code: u8,
    pub reason: String,
}

/// One batch of ops as delivered by the transport.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpList {
    ops: Vec<Op>,
}

impl OpList {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }
}

impl From<Vec<Op>> for OpList {
    fn from(ops: Vec<Op>) -> Self {
        Self::new(ops)
    }
}

impl IntoIterator for OpList {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}
