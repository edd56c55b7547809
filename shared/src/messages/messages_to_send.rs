use log::debug;

use crate::{
    messages::outgoing::{
        CreateEntityRequest, DeleteEntityRequest, EntityCommandFailure, EntityCommandRequest,
        EntityCommandResponse, EntityQueryRequest, LogMessage, Metrics, OutgoingComponentMessage,
        ReserveEntityIdsRequest,
    },
    EntityId,
};

/// Everything buffered for the transport during one tick, in send order per
/// kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagesToSend {
    pub component_messages: Vec<OutgoingComponentMessage>,
    pub reserve_entity_ids_requests: Vec<ReserveEntityIdsRequest>,
    pub create_entity_requests: Vec<CreateEntityRequest>,
    pub delete_entity_requests: Vec<DeleteEntityRequest>,
    pub entity_query_requests: Vec<EntityQueryRequest>,
    pub entity_command_requests: Vec<EntityCommandRequest>,
    pub entity_command_responses: Vec<EntityCommandResponse>,
    pub entity_command_failures: Vec<EntityCommandFailure>,
    pub log_messages: Vec<LogMessage>,
    pub metrics: Vec<Metrics>,
}

impl MessagesToSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.component_messages.is_empty()
            && self.reserve_entity_ids_requests.is_empty()
            && self.create_entity_requests.is_empty()
            && self.delete_entity_requests.is_empty()
            && self.entity_query_requests.is_empty()
            && self.entity_command_requests.is_empty()
            && self.entity_command_responses.is_empty()
            && self.entity_command_failures.is_empty()
            && self.log_messages.is_empty()
            && self.metrics.is_empty()
    }

    /// Drops buffered component mutations for an entity that left the view.
    pub fn discard_component_messages_for(&mut self, entity_id: EntityId) {
        let before = self.component_messages.len();
        self.component_messages
            .retain(|message| message.entity_id() != entity_id);
        let discarded = before - self.component_messages.len();
        if discarded > 0 {
            debug!(
                "discarded {} buffered component message(s) for removed entity {}",
                discarded, entity_id
            );
        }
    }
}
