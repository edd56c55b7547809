use crate::{
    ops::op::{
        CommandRequestOp, CommandResponseOp, CreateEntityResponseOp, DeleteEntityResponseOp,
        DisconnectOp, EntityQueryResponseOp, Op, OpList, QueriedEntity,
        ReserveEntityIdsResponseOp,
    },
    Authority, CommandRequest, CommandResponse, ComponentData, ComponentId, ComponentUpdate,
    EntityId, RequestId, StatusCode,
};

/// Fluent construction of an `OpList`, mostly for tests and tooling.
#[derive(Default)]
pub struct OpListBuilder {
    ops: Vec<Op>,
}

impl OpListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(mut self, entity_id: EntityId) -> Self {
        self.ops.push(Op::AddEntity { entity_id });
        self
    }

    pub fn remove_entity(mut self, entity_id: EntityId) -> Self {
        self.ops.push(Op::RemoveEntity { entity_id });
        self
    }

    pub fn add_component(mut self, entity_id: EntityId, data: ComponentData) -> Self {
        self.ops.push(Op::AddComponent { entity_id, data });
        self
    }

    pub fn remove_component(mut self, entity_id: EntityId, component_id: ComponentId) -> Self {
        self.ops.push(Op::RemoveComponent {
            entity_id,
            component_id,
        });
        self
    }

    pub fn update_component(mut self, entity_id: EntityId, update: ComponentUpdate) -> Self {
        self.ops.push(Op::ComponentUpdate { entity_id, update });
        self
    }

    pub fn refresh_component(mut self, entity_id: EntityId, data: ComponentData) -> Self {
        self.ops.push(Op::ComponentRefresh { entity_id, data });
        self
    }

    pub fn set_authority(
        mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    ) -> Self {
        self.ops.push(Op::AuthorityChange {
            entity_id,
            component_id,
            authority,
        });
        self
    }

    pub fn set_disconnect(mut self, status_code: u8, reason: impl Into<String>) -> Self {
        self.ops.push(Op::Disconnect(DisconnectOp {
            status_code,
            reason: reason.into(),
        }));
        self
    }

    pub fn add_reserve_entity_ids_response(
        mut self,
        request_id: RequestId,
        status: StatusCode,
        message: impl Into<String>,
        first_entity_id: Option<EntityId>,
        number_of_entity_ids: u32,
    ) -> Self {
        self.ops
            .push(Op::ReserveEntityIdsResponse(ReserveEntityIdsResponseOp {
                request_id,
                status,
                message: message.into(),
                first_entity_id,
                number_of_entity_ids,
            }));
        self
    }

    pub fn add_create_entity_response(
        mut self,
        request_id: RequestId,
        status: StatusCode,
        message: impl Into<String>,
        entity_id: Option<EntityId>,
    ) -> Self {
        self.ops.push(Op::CreateEntityResponse(CreateEntityResponseOp {
            request_id,
            status,
            message: message.into(),
            entity_id,
        }));
        self
    }

    pub fn add_delete_entity_response(
        mut self,
        request_id: RequestId,
        status: StatusCode,
        message: impl Into<String>,
        entity_id: EntityId,
    ) -> Self {
        self.ops.push(Op::DeleteEntityResponse(DeleteEntityResponseOp {
            request_id,
            status,
            message: message.into(),
            entity_id,
        }));
        self
    }

    pub fn add_entity_query_response(
        mut self,
        request_id: RequestId,
        status: StatusCode,
        message: impl Into<String>,
        results: Vec<QueriedEntity>,
    ) -> Self {
        self.ops.push(Op::EntityQueryResponse(EntityQueryResponseOp {
            request_id,
            status,
            message: message.into(),
            results,
        }));
        self
    }

    pub fn add_command_response(
        mut self,
        request_id: RequestId,
        entity_id: EntityId,
        status: StatusCode,
        message: impl Into<String>,
        response: Option<CommandResponse>,
    ) -> Self {
        self.ops.push(Op::CommandResponse(CommandResponseOp {
            request_id,
            entity_id,
            status,
            message: message.into(),
            response,
        }));
        self
    }

    pub fn add_command_request(
        mut self,
        request_id: RequestId,
        entity_id: EntityId,
        request: CommandRequest,
    ) -> Self {
        self.ops.push(Op::CommandRequest(CommandRequestOp {
            request_id,
            entity_id,
            request,
            timeout_millis: None,
        }));
        self
    }

    pub fn add_op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    pub fn build(self) -> OpList {
        OpList::new(self.ops)
    }
}
