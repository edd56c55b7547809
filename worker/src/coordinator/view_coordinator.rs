use std::time::Duration;

use log::{error, trace};

use shardview_shared::{
    CallbackId, CallbackRemover, CommandRequest, CommandResponse, CommandRetryHandler,
    ComponentData, ComponentId, ComponentUpdate, CreateEntityRequest, DeleteEntityRequest,
    DispatchError, Dispatcher, EntityCommandFailure, EntityCommandRequest, EntityCommandResponse,
    EntityComponentChange, EntityId, EntityQuery, EntityQueryRequest, EntityView,
    EntityViewElement, LogMessage, MessagesToSend, Metrics, RefreshTrigger, RequestId,
    ReserveEntityIdsRequest, RetryPolicy, SubView, ViewDelta, WorkerView,
};

use crate::{
    connection::ConnectionHandler,
    coordinator::WorkerConfig,
    cross_call::{CrossCallHandler, RpcExecutor},
    error::CoordinatorError,
};

/// Handle to a `SubView` owned by a `ViewCoordinator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubViewId(usize);

/// Drives one worker: pulls op lists from the connection, applies them to
/// the view, dispatches callbacks, and flushes buffered messages back.
///
/// A tick is `advance`, then whatever the application does with the new
/// delta (retry handlers, cross calls, local mutations), then
/// `flush_messages_to_send`.
pub struct ViewCoordinator {
    connection: Box<dyn ConnectionHandler>,
    worker_view: WorkerView,
    dispatcher: Dispatcher,
    sub_views: Vec<SubView>,
    config: WorkerConfig,
    next_request_id: u64,
    elapsed: Duration,
    last_delta_time: Duration,
}

impl ViewCoordinator {
    pub fn new(connection: Box<dyn ConnectionHandler>, config: WorkerConfig) -> Self {
        Self {
            connection,
            worker_view: WorkerView::new(),
            dispatcher: Dispatcher::new(),
            sub_views: Vec::new(),
            config,
            next_request_id: 1,
            elapsed: Duration::ZERO,
            last_delta_time: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn worker_id(&self) -> &str {
        self.connection.worker_id()
    }

    pub fn worker_attributes(&self) -> &[String] {
        self.connection.worker_attributes()
    }

    // Tick

    /// Applies every pending op list and dispatches the resulting delta
    ///
    /// # Panics
    ///
    /// Panics if the ops contradict the view.
    /// Consider using `try_advance` for non-panicking error handling.
    pub fn advance(&mut self, delta_time: Duration) {
        if let Err(err) = self.try_advance(delta_time) {
            panic!("{}", err);
        }
    }

    pub fn try_advance(&mut self, delta_time: Duration) -> Result<(), CoordinatorError> {
        self.elapsed += delta_time;
        self.last_delta_time = delta_time;

        self.connection.advance();
        let mut op_lists = Vec::with_capacity(self.connection.op_list_count());
        while let Some(op_list) = self.connection.next_op_list() {
            op_lists.push(op_list);
        }
        trace!("advancing view with {} op list(s)", op_lists.len());

        if let Err(err) = self.worker_view.try_advance_view_delta(op_lists) {
            error!("worker {}: {}", self.connection.worker_id(), err);
            return Err(err.into());
        }
        self.dispatcher
            .invoke_callbacks(self.worker_view.view_delta());
        for sub_view in &mut self.sub_views {
            sub_view.advance(self.worker_view.view(), self.worker_view.view_delta());
        }
        Ok(())
    }

    /// Hands everything buffered since the last flush to the connection.
    pub fn flush_messages_to_send(&mut self) {
        let messages = self.worker_view.flush_local_changes();
        if !messages.is_empty() {
            self.connection.send_messages(messages);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn last_delta_time(&self) -> Duration {
        self.last_delta_time
    }

    pub fn view(&self) -> &EntityView {
        self.worker_view.view()
    }

    pub fn view_delta(&self) -> &ViewDelta {
        self.worker_view.view_delta()
    }

    pub fn worker_view(&self) -> &WorkerView {
        &self.worker_view
    }

    pub fn worker_view_mut(&mut self) -> &mut WorkerView {
        &mut self.worker_view
    }

    pub fn messages_to_send_mut(&mut self) -> &mut MessagesToSend {
        self.worker_view.messages_to_send_mut()
    }

    // Request ids

    /// Allocates the next request id
    ///
    /// # Panics
    ///
    /// Panics once the 48-bit id space is exhausted.
    /// Consider using `try_next_request_id` for non-panicking error handling.
    pub fn next_request_id(&mut self) -> RequestId {
        match self.try_next_request_id() {
            Ok(request_id) => request_id,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_next_request_id(&mut self) -> Result<RequestId, CoordinatorError> {
        let request_id = RequestId::try_new(self.next_request_id)?;
        self.next_request_id += 1;
        Ok(request_id)
    }

    // Commands, sent once without retries

    pub fn send_reserve_entity_ids_request(
        &mut self,
        number_of_entity_ids: u32,
        timeout_millis: Option<u32>,
    ) -> RequestId {
        let request_id = self.next_request_id();
        self.worker_view
            .send_reserve_entity_ids_request(ReserveEntityIdsRequest {
                request_id,
                number_of_entity_ids,
                timeout_millis,
            });
        request_id
    }

    pub fn send_create_entity_request(
        &mut self,
        components: Vec<ComponentData>,
        entity_id: Option<EntityId>,
        timeout_millis: Option<u32>,
    ) -> RequestId {
        let request_id = self.next_request_id();
        self.worker_view
            .send_create_entity_request(CreateEntityRequest {
                request_id,
                components,
                entity_id,
                timeout_millis,
            });
        request_id
    }

    pub fn send_delete_entity_request(
        &mut self,
        entity_id: EntityId,
        timeout_millis: Option<u32>,
    ) -> RequestId {
        let request_id = self.next_request_id();
        self.worker_view
            .send_delete_entity_request(DeleteEntityRequest {
                request_id,
                entity_id,
                timeout_millis,
            });
        request_id
    }

    pub fn send_entity_query_request(
        &mut self,
        query: EntityQuery,
        timeout_millis: Option<u32>,
    ) -> RequestId {
        let request_id = self.next_request_id();
        self.worker_view
            .send_entity_query_request(EntityQueryRequest {
                request_id,
                query,
                timeout_millis,
            });
        request_id
    }

    pub fn send_entity_command_request(
        &mut self,
        entity_id: EntityId,
        request: CommandRequest,
        timeout_millis: Option<u32>,
    ) -> RequestId {
        let request_id = self.next_request_id();
        self.worker_view
            .send_entity_command_request(EntityCommandRequest {
                request_id,
                entity_id,
                request,
                timeout_millis,
            });
        request_id
    }

    pub fn send_entity_command_response(&mut self, request_id: RequestId, response: CommandResponse) {
        self.worker_view
            .send_entity_command_response(EntityCommandResponse {
                request_id,
                response,
            });
    }

    pub fn send_entity_command_failure(&mut self, request_id: RequestId, message: impl Into<String>) {
        self.worker_view
            .send_entity_command_failure(EntityCommandFailure {
                request_id,
                message: message.into(),
            });
    }

    // Component mutations

    pub fn send_add_component(&mut self, entity_id: EntityId, data: ComponentData) {
        self.worker_view.send_add_component(entity_id, data);
    }

    pub fn send_component_update(&mut self, entity_id: EntityId, update: ComponentUpdate) {
        self.worker_view.send_component_update(entity_id, update);
    }

    pub fn send_remove_component(&mut self, entity_id: EntityId, component_id: ComponentId) {
        self.worker_view.send_remove_component(entity_id, component_id);
    }

    // Diagnostics

    pub fn send_log_message(
        &mut self,
        level: log::Level,
        logger_name: impl Into<String>,
        message: impl Into<String>,
        entity_id: Option<EntityId>,
    ) {
        self.worker_view.send_log_message(LogMessage {
            level,
            logger_name: logger_name.into(),
            message: message.into(),
            entity_id,
        });
    }

    pub fn send_metrics(&mut self, metrics: Metrics) {
        self.worker_view.send_metrics(metrics);
    }

    // Callbacks

    pub fn register_component_added_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityComponentChange<'_>) + 'static,
    ) -> CallbackId {
        self.dispatcher.register_component_added_callback(
            component_id,
            callback,
            self.worker_view.view(),
        )
    }

    pub fn register_component_removed_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityComponentChange<'_>) + 'static,
    ) -> CallbackId {
        self.dispatcher
            .register_component_removed_callback(component_id, callback)
    }

    pub fn register_component_value_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityComponentChange<'_>) + 'static,
    ) -> CallbackId {
        self.dispatcher.register_component_value_callback(
            component_id,
            callback,
            self.worker_view.view(),
        )
    }

    pub fn register_authority_gained_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityId) + 'static,
    ) -> CallbackId {
        self.dispatcher.register_authority_gained_callback(
            component_id,
            callback,
            self.worker_view.view(),
        )
    }

    pub fn register_authority_lost_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityId) + 'static,
    ) -> CallbackId {
        self.dispatcher
            .register_authority_lost_callback(component_id, callback)
    }

    pub fn register_authority_lost_temporarily_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityId) + 'static,
    ) -> CallbackId {
        self.dispatcher
            .register_authority_lost_temporarily_callback(component_id, callback)
    }

    /// # Panics
    ///
    /// Panics if no callback with this id is registered.
    /// Consider using `try_remove_callback` for non-panicking error handling.
    pub fn remove_callback(&mut self, callback_id: CallbackId) {
        self.dispatcher.remove_callback(callback_id);
    }

    pub fn try_remove_callback(&mut self, callback_id: CallbackId) -> Result<(), DispatchError> {
        self.dispatcher.try_remove_callback(callback_id)
    }

    pub fn callback_remover(&self) -> CallbackRemover {
        self.dispatcher.callback_remover()
    }

    // Sub views

    /// Creates a sub view of the entities tagged with `tag` that pass
    /// `filter`. The filter runs again whenever one of `refresh_triggers`
    /// fires for a tagged entity.
    pub fn create_sub_view(
        &mut self,
        tag: ComponentId,
        filter: impl Fn(EntityId, &EntityViewElement) -> bool + 'static,
        refresh_triggers: &[RefreshTrigger],
    ) -> SubViewId {
        let sub_view = SubView::new(
            tag,
            Box::new(filter),
            refresh_triggers,
            &mut self.dispatcher,
            self.worker_view.view(),
        );
        self.push_sub_view(sub_view)
    }

    pub fn create_unfiltered_sub_view(&mut self, tag: ComponentId) -> SubViewId {
        let sub_view = SubView::unfiltered(tag, &mut self.dispatcher, self.worker_view.view());
        self.push_sub_view(sub_view)
    }

    pub fn sub_view(&self, sub_view_id: SubViewId) -> Option<&SubView> {
        self.sub_views.get(sub_view_id.0)
    }

    /// Runs every sub view's filter again for `entity_id` on the next tick.
    pub fn refresh_entity_completeness(&self, entity_id: EntityId) {
        for sub_view in &self.sub_views {
            sub_view.refresh_entity(entity_id);
        }
    }

    fn push_sub_view(&mut self, sub_view: SubView) -> SubViewId {
        trace!("created sub view for tag {}", sub_view.tag());
        self.sub_views.push(sub_view);
        SubViewId(self.sub_views.len() - 1)
    }

    // Handlers

    pub fn create_retry_handler<P: RetryPolicy>(&self) -> CommandRetryHandler<P> {
        CommandRetryHandler::new(self.config.retry.clone())
    }

    pub fn create_cross_call_handler<X: RpcExecutor>(&self, executor: X) -> CrossCallHandler<X> {
        CrossCallHandler::new(self.config.cross_call.clone(), executor)
    }
}

impl Drop for ViewCoordinator {
    fn drop(&mut self) {
        if self.config.flush_on_drop {
            self.flush_messages_to_send();
        }
    }
}
