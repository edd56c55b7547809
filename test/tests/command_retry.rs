/// COMMAND RETRY: transient failures are resent under retry ids
///
/// Timeouts back off exponentially, entity commands that lose authority are
/// resent at once, and every command reports exactly one terminal outcome
/// keyed by the id it was first sent with.

use std::time::Duration;

use shardview_shared::{
    CommandError, CommandRequest, CommandResponse, CommandRetryHandler, CreateEntityRequest,
    CreateEntityRetryPolicy, DeleteEntityRequest, DeleteEntityRetryPolicy, EntityCommandRequest,
    EntityCommandRetryPolicy, EntityQuery, EntityQueryRequest, EntityQueryRetryPolicy,
    MessagesToSend, Op, OpList, OpListBuilder, QueryConstraint, RequestId, ReserveEntityIdsRequest,
    ReserveEntityIdsRetryPolicy, RetryConfig, RetryLimit, RetryPolicy, StatusCode, WorkerView,
};
use shardview_test::{entity_id, init_logger, test_component_data, HEALTH, POSITION};

const TICK: Duration = Duration::from_millis(50);

fn ops(builder: OpListBuilder) -> Vec<Op> {
    builder.build().into_iter().collect()
}

fn create_request(id: u64) -> CreateEntityRequest {
    CreateEntityRequest {
        request_id: RequestId::new(id),
        components: vec![test_component_data(POSITION, 1.0)],
        entity_id: None,
        timeout_millis: None,
    }
}

fn command_request(id: u64) -> EntityCommandRequest {
    EntityCommandRequest {
        request_id: RequestId::new(id),
        entity_id: entity_id(8),
        request: CommandRequest::new(HEALTH, shardview_shared::CommandIndex::new(1)),
        timeout_millis: Some(500),
    }
}

/// Sends `request`, answers it with a timeout and checks the resend only
/// goes out once the first backoff delay has elapsed.
fn check_timeout_retried_after_backoff<P: RetryPolicy>(
    request: P::Request,
    timeout_response: impl Fn(RequestId) -> OpListBuilder,
    sent_ids: impl Fn(&MessagesToSend) -> Vec<RequestId>,
) {
    use shardview_shared::OutgoingRequest;

    let request_id = request.request_id();
    let mut handler = CommandRetryHandler::<P>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(request, RetryLimit::UntilComplete, &mut messages);
    assert_eq!(sent_ids(&messages), vec![request_id]);

    let outcomes = handler.process_ops(TICK, &ops(timeout_response(request_id)), &mut messages);
    assert!(outcomes.is_empty());

    handler.process_ops(TICK, &[], &mut messages);
    assert_eq!(sent_ids(&messages), vec![request_id], "resent before backoff elapsed");

    handler.process_ops(TICK, &[], &mut messages);
    assert_eq!(sent_ids(&messages), vec![request_id, request_id.retry()]);
    assert!(handler.is_outstanding(request_id));
}

#[test]
fn successful_command_completes_without_retry() {
    init_logger();
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(1), RetryLimit::UntilComplete, &mut messages);

    let outcomes = handler.process_ops(
        TICK,
        &ops(OpListBuilder::new().add_create_entity_response(
            RequestId::new(1),
            StatusCode::Success,
            "",
            Some(entity_id(40)),
        )),
        &mut messages,
    );

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].request_id, RequestId::new(1));
    assert_eq!(outcomes[0].attempts, 1);
    assert_eq!(outcomes[0].response.entity_id, Some(entity_id(40)));
    assert_eq!(messages.create_entity_requests.len(), 1);
    assert_eq!(handler.outstanding_count(), 0);
}

#[test]
fn reserve_entity_ids_timeout_is_retried() {
    init_logger();
    check_timeout_retried_after_backoff::<ReserveEntityIdsRetryPolicy>(
        ReserveEntityIdsRequest {
            request_id: RequestId::new(2),
            number_of_entity_ids: 10,
            timeout_millis: None,
        },
        |id| {
            OpListBuilder::new().add_reserve_entity_ids_response(id, StatusCode::Timeout, "timed out", None, 0)
        },
        |messages| messages.reserve_entity_ids_requests.iter().map(|r| r.request_id).collect(),
    );
}

#[test]
fn create_entity_timeout_is_retried() {
    init_logger();
    check_timeout_retried_after_backoff::<CreateEntityRetryPolicy>(
        create_request(3),
        |id| OpListBuilder::new().add_create_entity_response(id, StatusCode::Timeout, "timed out", None),
        |messages| messages.create_entity_requests.iter().map(|r| r.request_id).collect(),
    );
}

#[test]
fn delete_entity_timeout_is_retried() {
    init_logger();
    check_timeout_retried_after_backoff::<DeleteEntityRetryPolicy>(
        DeleteEntityRequest {
            request_id: RequestId::new(4),
            entity_id: entity_id(12),
            timeout_millis: None,
        },
        |id| {
            OpListBuilder::new().add_delete_entity_response(id, StatusCode::Timeout, "timed out", entity_id(12))
        },
        |messages| messages.delete_entity_requests.iter().map(|r| r.request_id).collect(),
    );
}

#[test]
fn entity_query_timeout_is_retried() {
    init_logger();
    check_timeout_retried_after_backoff::<EntityQueryRetryPolicy>(
        EntityQueryRequest {
            request_id: RequestId::new(5),
            query: EntityQuery::new(QueryConstraint::Component(POSITION)),
            timeout_millis: None,
        },
        |id| OpListBuilder::new().add_entity_query_response(id, StatusCode::Timeout, "timed out", Vec::new()),
        |messages| messages.entity_query_requests.iter().map(|r| r.request_id).collect(),
    );
}

#[test]
fn entity_command_timeout_is_retried() {
    init_logger();
    check_timeout_retried_after_backoff::<EntityCommandRetryPolicy>(
        command_request(6),
        |id| {
            OpListBuilder::new().add_command_response(id, entity_id(8), StatusCode::Timeout, "timed out", None)
        },
        |messages| messages.entity_command_requests.iter().map(|r| r.request_id).collect(),
    );
}

#[test]
fn retried_command_reports_original_id() {
    init_logger();
    let original = RequestId::new(5);
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(5), RetryLimit::UntilComplete, &mut messages);

    handler.process_ops(
        TICK,
        &ops(OpListBuilder::new().add_create_entity_response(original, StatusCode::Timeout, "", None)),
        &mut messages,
    );
    handler.process_ops(Duration::from_millis(100), &[], &mut messages);

    let retry_id = messages.create_entity_requests[1].request_id;
    assert_ne!(retry_id, original);
    assert_eq!(retry_id.original(), original);

    let outcomes = handler.process_ops(
        TICK,
        &ops(OpListBuilder::new().add_create_entity_response(
            retry_id,
            StatusCode::Success,
            "",
            Some(entity_id(41)),
        )),
        &mut messages,
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].request_id, original);
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(outcomes[0].response.request_id, retry_id);
}

#[test]
fn backoff_doubles_between_retries() {
    init_logger();
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(1), RetryLimit::UntilComplete, &mut messages);

    let first = RequestId::new(1);
    handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_create_entity_response(first, StatusCode::Timeout, "", None)),
        &mut messages,
    );
    handler.process_ops(Duration::from_millis(100), &[], &mut messages);
    assert_eq!(messages.create_entity_requests.len(), 2);

    handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_create_entity_response(first.retry(), StatusCode::Timeout, "", None)),
        &mut messages,
    );
    handler.process_ops(Duration::from_millis(199), &[], &mut messages);
    assert_eq!(messages.create_entity_requests.len(), 2);

    handler.process_ops(Duration::from_millis(1), &[], &mut messages);
    assert_eq!(messages.create_entity_requests.len(), 3);
    assert_eq!(messages.create_entity_requests[2].request_id, first.retry().retry());
}

#[test]
fn application_error_is_terminal() {
    init_logger();
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(1), RetryLimit::UntilComplete, &mut messages);

    let outcomes = handler.process_ops(
        TICK,
        &ops(OpListBuilder::new().add_create_entity_response(
            RequestId::new(1),
            StatusCode::ApplicationError,
            "entity rejected",
            None,
        )),
        &mut messages,
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, StatusCode::ApplicationError);
    assert_eq!(outcomes[0].message, "entity rejected");
    assert_eq!(outcomes[0].attempts, 1);

    handler.process_ops(Duration::from_secs(10), &[], &mut messages);
    assert_eq!(messages.create_entity_requests.len(), 1);
}

#[test]
fn lost_authority_resends_entity_command_immediately() {
    init_logger();
    let original = RequestId::new(7);
    let mut handler = CommandRetryHandler::<EntityCommandRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(command_request(7), RetryLimit::UntilComplete, &mut messages);

    let outcomes = handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_command_response(
            original,
            entity_id(8),
            StatusCode::AuthorityLost,
            "authority moved",
            None,
        )),
        &mut messages,
    );
    assert!(outcomes.is_empty());
    assert_eq!(messages.entity_command_requests.len(), 2);
    assert_eq!(messages.entity_command_requests[1].request_id, original.retry());

    let response = CommandResponse::new(HEALTH, shardview_shared::CommandIndex::new(1));
    let outcomes = handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_command_response(
            original.retry(),
            entity_id(8),
            StatusCode::Success,
            "",
            Some(response.clone()),
        )),
        &mut messages,
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].request_id, original);
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(outcomes[0].response.response, Some(response));
}

#[test]
fn lost_authority_is_terminal_for_other_commands() {
    init_logger();
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(1), RetryLimit::UntilComplete, &mut messages);

    let outcomes = handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_create_entity_response(
            RequestId::new(1),
            StatusCode::AuthorityLost,
            "",
            None,
        )),
        &mut messages,
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, StatusCode::AuthorityLost);
    assert_eq!(messages.create_entity_requests.len(), 1);
}

#[test]
fn responses_to_superseded_attempts_are_ignored() {
    init_logger();
    let original = RequestId::new(9);
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(9), RetryLimit::UntilComplete, &mut messages);

    let timeout = ops(OpListBuilder::new().add_create_entity_response(original, StatusCode::Timeout, "", None));
    handler.process_ops(Duration::ZERO, &timeout, &mut messages);

    // while waiting for the backoff
    let late_success =
        ops(OpListBuilder::new().add_create_entity_response(original, StatusCode::Success, "", Some(entity_id(1))));
    assert!(handler
        .process_ops(Duration::ZERO, &late_success, &mut messages)
        .is_empty());

    handler.process_ops(Duration::from_millis(100), &[], &mut messages);

    // after the retry went out
    assert!(handler
        .process_ops(Duration::ZERO, &late_success, &mut messages)
        .is_empty());
    assert!(handler.is_outstanding(original));

    let outcomes = handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_create_entity_response(
            original.retry(),
            StatusCode::Success,
            "",
            Some(entity_id(2)),
        )),
        &mut messages,
    );
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].response.entity_id, Some(entity_id(2)));
}

#[test]
fn retry_limit_surfaces_last_failure() {
    init_logger();
    let original = RequestId::new(3);
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(3), RetryLimit::Attempts(2), &mut messages);

    handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_create_entity_response(original, StatusCode::Timeout, "", None)),
        &mut messages,
    );
    handler.process_ops(Duration::from_millis(100), &[], &mut messages);

    let outcomes = handler.process_ops(
        Duration::ZERO,
        &ops(OpListBuilder::new().add_create_entity_response(
            original.retry(),
            StatusCode::Timeout,
            "still timed out",
            None,
        )),
        &mut messages,
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, StatusCode::Timeout);
    assert_eq!(outcomes[0].message, "still timed out");
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(handler.outstanding_count(), 0);
}

#[test]
fn cancelled_command_ignores_its_response() {
    init_logger();
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(1), RetryLimit::UntilComplete, &mut messages);

    assert!(handler.cancel(RequestId::new(1)));
    assert!(!handler.cancel(RequestId::new(1)));

    let outcomes = handler.process_ops(
        TICK,
        &ops(OpListBuilder::new().add_create_entity_response(
            RequestId::new(1),
            StatusCode::Success,
            "",
            Some(entity_id(1)),
        )),
        &mut messages,
    );
    assert!(outcomes.is_empty());
}

#[test]
fn invalid_new_requests_are_rejected() {
    init_logger();
    let mut handler = CommandRetryHandler::<CreateEntityRetryPolicy>::default();
    let mut messages = MessagesToSend::new();
    handler.send_request(create_request(1), RetryLimit::UntilComplete, &mut messages);

    assert_eq!(
        handler.try_send_request(create_request(1), RetryLimit::UntilComplete, &mut messages),
        Err(CommandError::DuplicateRequest {
            request_id: RequestId::new(1)
        })
    );

    let mut retry = create_request(2);
    retry.request_id = RequestId::new(2).retry();
    assert_eq!(
        handler.try_send_request(retry, RetryLimit::UntilComplete, &mut messages),
        Err(CommandError::RetryIdForNewRequest {
            request_id: RequestId::new(2).retry(),
            attempt: 1
        })
    );
    assert_eq!(messages.create_entity_requests.len(), 1);
}

#[test]
fn responses_are_read_from_view_delta() {
    init_logger();
    let mut worker_view = WorkerView::new();
    let mut handler = CommandRetryHandler::<DeleteEntityRetryPolicy>::new(RetryConfig {
        base_delay: Duration::from_millis(10),
        ..RetryConfig::default()
    });
    handler.send_request(
        DeleteEntityRequest {
            request_id: RequestId::new(1),
            entity_id: entity_id(3),
            timeout_millis: None,
        },
        RetryLimit::UntilComplete,
        worker_view.messages_to_send_mut(),
    );

    worker_view.advance_view_delta(vec![OpListBuilder::new()
        .add_delete_entity_response(RequestId::new(1), StatusCode::Timeout, "", entity_id(3))
        .build()]);
    assert!(handler
        .process_view_delta(Duration::ZERO, &mut worker_view)
        .is_empty());

    worker_view.advance_view_delta(Vec::<OpList>::new());
    assert!(handler
        .process_view_delta(Duration::from_millis(10), &mut worker_view)
        .is_empty());

    let sent = worker_view.flush_local_changes();
    assert_eq!(
        sent.delete_entity_requests
            .iter()
            .map(|request| request.request_id)
            .collect::<Vec<_>>(),
        vec![RequestId::new(1), RequestId::new(1).retry()]
    );

    worker_view.advance_view_delta(vec![OpListBuilder::new()
        .add_delete_entity_response(RequestId::new(1).retry(), StatusCode::Success, "", entity_id(3))
        .build()]);
    let outcomes = handler.process_view_delta(Duration::ZERO, &mut worker_view);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].request_id, RequestId::new(1));
}
