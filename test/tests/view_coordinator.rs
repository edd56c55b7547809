/// VIEW COORDINATOR: one worker tick end to end
///
/// Op lists come in through a `TestConnection`, the view and its delta are
/// updated, callbacks run, and buffered messages go back out on flush.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use shardview_shared::{
    Authority, ComponentData, CreateEntityRequest, CreateEntityRetryPolicy, EntityDeltaKind,
    Metrics, OpListBuilder, OutgoingComponentMessage, RefreshTrigger, RequestId, RetryConfig,
    RetryLimit, StatusCode, ViewError,
};
use shardview_test::{
    cross_call_request, entity_id, init_logger, test_component_data, test_component_update,
    MockRpcExecutor, TestConnection, TestConnectionHandle, HEALTH, INTEREST_TAG, POSITION,
};
use shardview_worker::{CoordinatorError, ViewCoordinator, WorkerConfig};

const FRAME: Duration = Duration::from_millis(16);

fn coordinator(config: WorkerConfig) -> (ViewCoordinator, TestConnectionHandle) {
    let (connection, handle) = TestConnection::new("worker-1");
    (ViewCoordinator::new(Box::new(connection), config), handle)
}

#[test]
fn advance_applies_every_pending_op_list() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    let added = Rc::new(RefCell::new(Vec::new()));
    let added_in = added.clone();
    coordinator.register_component_added_callback(POSITION, move |event| {
        added_in.borrow_mut().push(event.entity_id)
    });

    handle.push_op_list(
        OpListBuilder::new()
            .add_entity(entity_id(1))
            .add_component(entity_id(1), test_component_data(POSITION, 1.0))
            .build(),
    );
    handle.push_op_list(
        OpListBuilder::new()
            .add_entity(entity_id(2))
            .add_component(entity_id(2), test_component_data(POSITION, 2.0))
            .build(),
    );
    coordinator.advance(FRAME);

    assert_eq!(handle.pending_op_lists(), 0);
    assert_eq!(handle.advance_count(), 1);
    assert_eq!(*added.borrow(), vec![entity_id(1), entity_id(2)]);
    assert_eq!(coordinator.view().len(), 2);
    assert_eq!(coordinator.view_delta().entity_deltas().len(), 2);
    assert_eq!(coordinator.elapsed(), FRAME);
    assert_eq!(coordinator.last_delta_time(), FRAME);

    coordinator.advance(FRAME);
    assert!(coordinator.view_delta().is_empty());
    assert_eq!(coordinator.elapsed(), FRAME * 2);
}

#[test]
fn worker_identity_comes_from_connection() {
    let (coordinator, _handle) = coordinator(WorkerConfig::default());

    assert_eq!(coordinator.worker_id(), "worker-1");
    assert_eq!(coordinator.worker_attributes(), ["test_worker".to_string()]);
}

#[test]
fn request_ids_are_allocated_in_order() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());

    let reserve = coordinator.send_reserve_entity_ids_request(5, None);
    let create =
        coordinator.send_create_entity_request(vec![test_component_data(POSITION, 0.0)], None, Some(100));
    let delete = coordinator.send_delete_entity_request(entity_id(3), None);

    assert_eq!(reserve, RequestId::new(1));
    assert_eq!(create, RequestId::new(2));
    assert_eq!(delete, RequestId::new(3));

    coordinator.flush_messages_to_send();
    let sent = handle.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reserve_entity_ids_requests[0].number_of_entity_ids, 5);
    assert_eq!(sent[0].create_entity_requests[0].timeout_millis, Some(100));
    assert_eq!(sent[0].delete_entity_requests[0].entity_id, entity_id(3));
}

#[test]
fn flush_without_messages_sends_nothing() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());

    coordinator.advance(FRAME);
    coordinator.flush_messages_to_send();

    assert!(handle.take_sent().is_empty());
}

#[test]
fn local_mutations_are_flushed_in_order() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    handle.push_op_list(
        OpListBuilder::new()
            .add_entity(entity_id(1))
            .add_component(entity_id(1), test_component_data(POSITION, 1.0))
            .set_authority(entity_id(1), POSITION, Authority::Authoritative)
            .build(),
    );
    coordinator.advance(FRAME);

    coordinator.send_component_update(entity_id(1), test_component_update(POSITION, 2.0));
    coordinator.send_remove_component(entity_id(1), POSITION);
    coordinator.send_log_message(log::Level::Info, "test", "moved", Some(entity_id(1)));
    coordinator.send_metrics(Metrics::default().with_gauge("entities", 1.0));
    coordinator.flush_messages_to_send();

    let sent = handle.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].component_messages,
        vec![
            OutgoingComponentMessage::Update {
                entity_id: entity_id(1),
                update: test_component_update(POSITION, 2.0),
            },
            OutgoingComponentMessage::Remove {
                entity_id: entity_id(1),
                component_id: POSITION,
            },
        ]
    );
    assert_eq!(sent[0].log_messages[0].message, "moved");
    assert_eq!(sent[0].metrics[0].gauges["entities"], 1.0);
}

#[test]
fn buffered_messages_are_flushed_on_drop() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    coordinator.send_delete_entity_request(entity_id(1), None);

    drop(coordinator);

    let sent = handle.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].delete_entity_requests.len(), 1);
}

#[test]
fn drop_does_not_flush_when_disabled() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig {
        flush_on_drop: false,
        ..WorkerConfig::default()
    });
    coordinator.send_delete_entity_request(entity_id(1), None);

    drop(coordinator);

    assert!(handle.take_sent().is_empty());
}

#[test]
fn inconsistent_ops_are_reported() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    handle.push_op_list(
        OpListBuilder::new()
            .update_component(entity_id(4), test_component_update(POSITION, 1.0))
            .build(),
    );

    let result = coordinator.try_advance(FRAME);

    assert!(matches!(
        result,
        Err(CoordinatorError::View(ViewError::EntityNotFound { .. }))
    ));
    assert!(coordinator.view().is_empty());
}

#[test]
fn retry_handler_uses_coordinator_config() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig {
        retry: RetryConfig {
            base_delay: Duration::from_millis(32),
            ..RetryConfig::default()
        },
        ..WorkerConfig::default()
    });
    let mut handler = coordinator.create_retry_handler::<CreateEntityRetryPolicy>();
    assert_eq!(handler.config().base_delay, Duration::from_millis(32));

    let request_id = coordinator.next_request_id();
    handler.send_request(
        CreateEntityRequest {
            request_id,
            components: Vec::new(),
            entity_id: None,
            timeout_millis: None,
        },
        RetryLimit::UntilComplete,
        coordinator.messages_to_send_mut(),
    );
    coordinator.flush_messages_to_send();

    handle.push_op_list(
        OpListBuilder::new()
            .add_create_entity_response(request_id, StatusCode::Timeout, "", None)
            .build(),
    );
    coordinator.advance(FRAME);
    assert!(handler
        .process_view_delta(FRAME, coordinator.worker_view_mut())
        .is_empty());

    coordinator.advance(FRAME);
    handler.process_view_delta(FRAME, coordinator.worker_view_mut());
    coordinator.advance(FRAME);
    handler.process_view_delta(FRAME, coordinator.worker_view_mut());
    coordinator.flush_messages_to_send();

    let sent = handle.take_sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].create_entity_requests[0].request_id, request_id.retry());
}

#[test]
fn cross_calls_run_from_coordinator_view() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    let mut cross_calls = coordinator.create_cross_call_handler(MockRpcExecutor::new());

    handle.push_op_list(
        OpListBuilder::new()
            .add_entity(entity_id(1))
            .add_command_request(RequestId::new(11), entity_id(1), cross_call_request(&[entity_id(2)]))
            .build(),
    );
    coordinator.advance(FRAME);
    cross_calls.process_view_delta(FRAME, coordinator.worker_view());
    assert_eq!(cross_calls.queued_count(), 1);

    handle.push_op_list(OpListBuilder::new().add_entity(entity_id(2)).build());
    coordinator.advance(FRAME);
    cross_calls.process_view_delta(FRAME, coordinator.worker_view());

    assert_eq!(cross_calls.executor().executed, vec![RequestId::new(11)]);
}

#[test]
fn sub_views_advance_with_the_coordinator() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    let everything = coordinator.create_unfiltered_sub_view(INTEREST_TAG);
    let healthy = coordinator.create_sub_view(
        INTEREST_TAG,
        |_, element| element.has_component(HEALTH),
        &[RefreshTrigger::Component(HEALTH)],
    );
    assert_ne!(everything, healthy);

    handle.push_op_list(
        OpListBuilder::new()
            .add_entity(entity_id(1))
            .add_component(entity_id(1), ComponentData::new(INTEREST_TAG))
            .add_entity(entity_id(2))
            .add_component(entity_id(2), ComponentData::new(INTEREST_TAG))
            .add_component(entity_id(2), test_component_data(HEALTH, 5.0))
            .build(),
    );
    coordinator.advance(FRAME);

    let everything_view = coordinator.sub_view(everything).expect("sub view");
    assert_eq!(everything_view.complete_entities().len(), 2);
    let healthy_view = coordinator.sub_view(healthy).expect("sub view");
    assert!(!healthy_view.is_complete(entity_id(1)));
    assert!(healthy_view.is_complete(entity_id(2)));
    assert_eq!(healthy_view.view_delta().entity_deltas().len(), 1);

    handle.push_op_list(
        OpListBuilder::new()
            .remove_component(entity_id(2), HEALTH)
            .build(),
    );
    coordinator.advance(FRAME);

    let healthy_view = coordinator.sub_view(healthy).expect("sub view");
    assert_eq!(
        healthy_view.view_delta().entity_delta(entity_id(2)).map(|delta| delta.kind),
        Some(EntityDeltaKind::Remove)
    );
    assert!(coordinator
        .sub_view(everything)
        .expect("sub view")
        .is_complete(entity_id(2)));
}

#[test]
fn refresh_entity_completeness_reaches_every_sub_view() {
    init_logger();
    let (mut coordinator, handle) = coordinator(WorkerConfig::default());
    let allowed = Rc::new(Cell::new(true));
    let allowed_in = allowed.clone();
    let gated = coordinator.create_sub_view(INTEREST_TAG, move |_, _| allowed_in.get(), &[]);

    handle.push_op_list(
        OpListBuilder::new()
            .add_entity(entity_id(1))
            .add_component(entity_id(1), ComponentData::new(INTEREST_TAG))
            .build(),
    );
    coordinator.advance(FRAME);
    assert!(coordinator.sub_view(gated).expect("sub view").is_complete(entity_id(1)));

    allowed.set(false);
    coordinator.refresh_entity_completeness(entity_id(1));
    coordinator.advance(FRAME);

    assert!(!coordinator.sub_view(gated).expect("sub view").is_complete(entity_id(1)));
}
