use log::{error, warn};

use crate::{
    messages::outgoing::{
        CreateEntityRequest, DeleteEntityRequest, EntityCommandFailure, EntityCommandRequest,
        EntityCommandResponse, EntityQueryRequest, LogMessage, Metrics, OutgoingComponentMessage,
        ReserveEntityIdsRequest,
    },
    world::delta::error::ViewError,
    ComponentData, ComponentId, ComponentUpdate, EntityId, EntityView, MessagesToSend, OpList,
    ViewDelta,
};

/// Owns the local view, the delta of the current tick, and everything
/// buffered for the transport since the last flush.
#[derive(Default)]
pub struct WorkerView {
    view: EntityView,
    delta: ViewDelta,
    local_changes: MessagesToSend,
}

impl WorkerView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current delta with the net result of `op_lists`
    ///
    /// # Panics
    ///
    /// Panics if the ops contradict the view.
    /// Consider using `try_advance_view_delta` for non-panicking error handling.
    pub fn advance_view_delta(&mut self, op_lists: Vec<OpList>) {
        if let Err(err) = self.try_advance_view_delta(op_lists) {
            error!("received ops inconsistent with the local view: {}", err);
            panic!("received ops inconsistent with the local view: {}", err);
        }
    }

    pub fn try_advance_view_delta(&mut self, op_lists: Vec<OpList>) -> Result<(), ViewError> {
        let delta = ViewDelta::try_from_ops(&mut self.view, op_lists)?;

        for entity_id in delta.removed_entities() {
            self.local_changes.discard_component_messages_for(*entity_id);
        }

        self.delta = delta;
        Ok(())
    }

    pub fn view(&self) -> &EntityView {
        &self.view
    }

    pub fn view_delta(&self) -> &ViewDelta {
        &self.delta
    }

    /// The current delta alongside the outgoing buffer, so handlers can
    /// react to responses by sending new requests.
    pub fn delta_and_messages(&mut self) -> (&ViewDelta, &mut MessagesToSend) {
        (&self.delta, &mut self.local_changes)
    }

    pub fn messages_to_send_mut(&mut self) -> &mut MessagesToSend {
        &mut self.local_changes
    }

    pub fn has_messages_to_send(&self) -> bool {
        !self.local_changes.is_empty()
    }

    pub fn flush_local_changes(&mut self) -> MessagesToSend {
        std::mem::take(&mut self.local_changes)
    }

    // Component mutations

    pub fn send_add_component(&mut self, entity_id: EntityId, data: ComponentData) {
        self.local_changes
            .component_messages
            .push(OutgoingComponentMessage::Add { entity_id, data });
    }

    pub fn send_component_update(&mut self, entity_id: EntityId, update: ComponentUpdate) {
        if !self
            .view
            .authority(entity_id, update.component_id())
            .is_authoritative()
        {
            warn!(
                "sending update for component {} of entity {} without authority",
                update.component_id(),
                entity_id
            );
        }
        self.local_changes
            .component_messages
            .push(OutgoingComponentMessage::Update { entity_id, update });
    }

    pub fn send_remove_component(&mut self, entity_id: EntityId, component_id: ComponentId) {
        self.local_changes
            .component_messages
            .push(OutgoingComponentMessage::Remove {
                entity_id,
                component_id,
            });
    }

    // Commands

    pub fn send_reserve_entity_ids_request(&mut self, request: ReserveEntityIdsRequest) {
        self.local_changes.reserve_entity_ids_requests.push(request);
    }

    pub fn send_create_entity_request(&mut self, request: CreateEntityRequest) {
        self.local_changes.create_entity_requests.push(request);
    }

    pub fn send_delete_entity_request(&mut self, request: DeleteEntityRequest) {
        self.local_changes.delete_entity_requests.push(request);
    }

    pub fn send_entity_query_request(&mut self, request: EntityQueryRequest) {
        self.local_changes.entity_query_requests.push(request);
    }

    pub fn send_entity_command_request(&mut self, request: EntityCommandRequest) {
        self.local_changes.entity_command_requests.push(request);
    }

    pub fn send_entity_command_response(&mut self, response: EntityCommandResponse) {
        self.local_changes.entity_command_responses.push(response);
    }

    pub fn send_entity_command_failure(&mut self, failure: EntityCommandFailure) {
        self.local_changes.entity_command_failures.push(failure);
    }

    // Diagnostics

    pub fn send_log_message(&mut self, message: LogMessage) {
        self.local_changes.log_messages.push(message);
    }

    pub fn send_metrics(&mut self, metrics: Metrics) {
        self.local_changes.metrics.push(metrics);
    }
}
