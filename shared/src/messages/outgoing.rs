use std::collections::BTreeMap;

use crate::{
    CommandRequest, CommandResponse, ComponentData, ComponentId, ComponentUpdate, EntityId,
    EntityQuery, RequestId,
};

/// A local mutation of a Component this process is authoritative over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutgoingComponentMessage {
    Add {
        entity_id: EntityId,
        data: ComponentData,
    },
    Update {
        entity_id: EntityId,
        update: ComponentUpdate,
    },
    Remove {
        entity_id: EntityId,
        component_id: ComponentId,
    },
}

impl OutgoingComponentMessage {
    pub fn entity_id(&self) -> EntityId {
        match self {
            OutgoingComponentMessage::Add { entity_id, .. }
            | OutgoingComponentMessage::Update { entity_id, .. }
            | OutgoingComponentMessage::Remove { entity_id, .. } => *entity_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveEntityIdsRequest {
    pub request_id: RequestId,
    pub number_of_entity_ids: u32,
    pub timeout_millis: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateEntityRequest {
    pub request_id: RequestId,
    pub components: Vec<ComponentData>,
    /// A previously reserved id, or `None` to let the runtime choose.
    pub entity_id: Option<EntityId>,
    pub timeout_millis: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteEntityRequest {
    pub request_id: RequestId,
    pub entity_id: EntityId,
    pub timeout_millis: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityQueryRequest {
    pub request_id: RequestId,
    pub query: EntityQuery,
    pub timeout_millis: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityCommandRequest {
    pub request_id: RequestId,
    pub entity_id: EntityId,
    pub request: CommandRequest,
    pub timeout_millis: Option<u32>,
}

/// Answer to an incoming command request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityCommandResponse {
    pub request_id: RequestId,
    pub response: CommandResponse,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityCommandFailure {
    pub request_id: RequestId,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogMessage {
    pub level: log::Level,
    pub logger_name: String,
    pub message: String,
    pub entity_id: Option<EntityId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metrics {
    pub load: Option<f64>,
    pub gauges: BTreeMap<String, f64>,
}

impl Metrics {
    pub fn with_gauge(mut self, name: impl Into<String>, value: f64) -> Self {
        self.gauges.insert(name.into(), value);
        self
    }
}

/// Anything a retry policy may need to resend.
pub trait OutgoingRequest: Clone {
    fn request_id(&self) -> RequestId;
    fn set_request_id(&mut self, request_id: RequestId);
}

macro_rules! impl_outgoing_request {
    ($($request:ty),* $(,)?) => {
        $(
            impl OutgoingRequest for $request {
                fn request_id(&self) -> RequestId {
                    self.request_id
                }

                fn set_request_id(&mut self, request_id: RequestId) {
                    self.request_id = request_id;
                }
            }
        )*
    };
}

impl_outgoing_request!(
    ReserveEntityIdsRequest,
    CreateEntityRequest,
    DeleteEntityRequest,
    EntityQueryRequest,
    EntityCommandRequest,
);
