use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    time::Duration,
};

use log::{debug, info, trace, warn};

use shardview_shared::{
    CommandRequestOp, EntityId, EntityView, Op, RequestId, WorkerView,
};

use crate::cross_call::{
    cross_call_config::CrossCallConfig,
    error::CrossCallError,
    rpc_executor::{CrossCallParams, RpcExecutor},
};

/// A cross call waiting in its target entity's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedCrossCall {
    pub params: CrossCallParams,
    /// Handler clock when the call arrived.
    pub arrived_at: Duration,
}

/// Defers incoming cross calls until the objects they refer to are in the
/// view, keeping calls to the same entity in arrival order.
///
/// A call runs as soon as every object reference resolves, or is forced
/// once it has waited `max_wait`. Request ids are remembered from arrival
/// until `in_flight_window` after execution so duplicate deliveries are
/// dropped.
pub struct CrossCallHandler<X: RpcExecutor> {
    config: CrossCallConfig,
    executor: X,
    clock: Duration,
    queued: BTreeMap<EntityId, VecDeque<QueuedCrossCall>>,
    in_flight: HashSet<RequestId>,
    to_forget: VecDeque<(Duration, RequestId)>,
}

impl<X: RpcExecutor> CrossCallHandler<X> {
    pub fn new(config: CrossCallConfig, executor: X) -> Self {
        Self {
            config,
            executor,
            clock: Duration::ZERO,
            queued: BTreeMap::new(),
            in_flight: HashSet::new(),
            to_forget: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &CrossCallConfig {
        &self.config
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut X {
        &mut self.executor
    }

    /// Queues per target entity. Entities with an empty queue are absent.
    pub fn queued_cross_calls(&self) -> &BTreeMap<EntityId, VecDeque<QueuedCrossCall>> {
        &self.queued
    }

    pub fn queued_count(&self) -> usize {
        self.queued.values().map(VecDeque::len).sum()
    }

    /// Request ids currently remembered, queued calls included.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Executed request ids waiting for their window to pass.
    pub fn pending_forget_count(&self) -> usize {
        self.to_forget.len()
    }

    /// Handles command requests and entity removals in `ops`, then retries
    /// every queued call.
    pub fn process_ops(&mut self, delta_time: Duration, ops: &[Op], view: &EntityView) {
        self.advance_clock(delta_time);

        for op in ops {
            match op {
                Op::CommandRequest(request) => self.handle_command_request(request, view),
                Op::RemoveEntity { entity_id } => self.drop_queue_for_entity(*entity_id),
                _ => {}
            }
        }

        self.process_queued_cross_calls(view);
    }

    /// Same as `process_ops`, reading the current delta of `worker_view`.
    /// Queues are dropped for every entity a remove op targeted, even when
    /// the entity was added back later in the batch.
    pub fn process_view_delta(&mut self, delta_time: Duration, worker_view: &WorkerView) {
        self.advance_clock(delta_time);
        let delta = worker_view.view_delta();
        let view = worker_view.view();

        for entity_id in delta.removed_entities() {
            self.drop_queue_for_entity(*entity_id);
        }
        for op in delta.worker_messages() {
            if let Op::CommandRequest(request) = op {
                self.handle_command_request(request, view);
            }
        }

        self.process_queued_cross_calls(view);
    }

    /// Accepts a decoded cross call, running it at once when nothing blocks
    /// it. Fails if the target is not in the view or the request id is a
    /// duplicate.
    pub fn try_enqueue(&mut self, params: CrossCallParams, view: &EntityView) -> Result<(), CrossCallError> {
        let request_id = params.request_id;
        let entity_id = params.target.entity_id;

        if self.in_flight.contains(&request_id) {
            return Err(CrossCallError::Duplicate { request_id });
        }
        if !view.has_entity(entity_id) {
            return Err(CrossCallError::UnknownTarget {
                request_id,
                entity_id,
            });
        }
        self.in_flight.insert(request_id);

        let call = QueuedCrossCall {
            params,
            arrived_at: self.clock,
        };

        if let Some(queue) = self.queued.get_mut(&entity_id) {
            trace!("queueing cross call {} behind {} others", request_id, queue.len());
            queue.push_back(call);
            return Ok(());
        }

        if self.try_execute(&call, view) {
            self.mark_executed(request_id);
        } else {
            debug!("queueing cross call {} for entity {}", request_id, entity_id);
            self.queued.entry(entity_id).or_default().push_back(call);
        }
        Ok(())
    }

    /// Retries the head of every queue, draining each as far as it will go.
    pub fn process_queued_cross_calls(&mut self, view: &EntityView) {
        let entity_ids: Vec<EntityId> = self.queued.keys().copied().collect();

        for entity_id in entity_ids {
            while let Some(head) = self.queued.get(&entity_id).and_then(VecDeque::front) {
                let head = head.clone();
                let request_id = head.params.request_id;

                if self.try_execute(&head, view) {
                    self.mark_executed(request_id);
                } else if self.waited(&head) >= self.config.expire_after {
                    warn!(
                        "dropping cross call {} for entity {} after {:?} without executing",
                        request_id,
                        entity_id,
                        self.waited(&head)
                    );
                    self.in_flight.remove(&request_id);
                } else {
                    break;
                }

                self.pop_head(entity_id);
            }
        }
    }

    fn handle_command_request(&mut self, request: &CommandRequestOp, view: &EntityView) {
        let Some(params) = self.executor.try_retrieve(request, view) else {
            trace!("command request {} is not a cross call", request.request_id);
            return;
        };

        if let Err(err) = self.try_enqueue(params, view) {
            debug!("discarding cross call: {}", err);
        }
    }

    fn try_execute(&mut self, call: &QueuedCrossCall, view: &EntityView) -> bool {
        let unresolved = call.params.unresolved_refs(view).count();
        if unresolved > 0 {
            let waited = self.waited(call);
            if waited < self.config.max_wait {
                return false;
            }
            info!(
                "forcing cross call {} with {} unresolved reference(s) after {:?}",
                call.params.request_id, unresolved, waited
            );
        }
        self.executor.execute(&call.params)
    }

    fn waited(&self, call: &QueuedCrossCall) -> Duration {
        self.clock.saturating_sub(call.arrived_at)
    }

    fn mark_executed(&mut self, request_id: RequestId) {
        trace!("executed cross call {}", request_id);
        self.to_forget
            .push_back((self.clock + self.config.in_flight_window, request_id));
    }

    fn pop_head(&mut self, entity_id: EntityId) {
        if let Some(queue) = self.queued.get_mut(&entity_id) {
            queue.pop_front();
            if queue.is_empty() {
                self.queued.remove(&entity_id);
            }
        }
    }

    fn drop_queue_for_entity(&mut self, entity_id: EntityId) {
        let Some(queue) = self.queued.remove(&entity_id) else {
            return;
        };
        debug!(
            "dropping {} queued cross call(s) for removed entity {}",
            queue.len(),
            entity_id
        );
        for call in queue {
            self.in_flight.remove(&call.params.request_id);
        }
    }

    fn advance_clock(&mut self, delta_time: Duration) {
        self.clock += delta_time;
        while let Some((forget_at, request_id)) = self.to_forget.front().copied() {
            if forget_at > self.clock {
                break;
            }
            self.to_forget.pop_front();
            self.in_flight.remove(&request_id);
        }
    }
}
