use crate::{
    messages::outgoing::{
        CreateEntityRequest, DeleteEntityRequest, EntityCommandRequest, EntityQueryRequest,
        OutgoingRequest, ReserveEntityIdsRequest,
    },
    ops::op::{
        CommandResponseOp, CreateEntityResponseOp, DeleteEntityResponseOp, EntityQueryResponseOp,
        ReserveEntityIdsResponseOp,
    },
    MessagesToSend, Op, RequestId, StatusCode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryKind {
    /// Resend in the same processing pass.
    Immediate,
    /// Resend once the backoff delay has elapsed.
    Backoff,
}

/// Binds one command kind to the retry engine: which requests it sends,
/// which ops answer them, and which failures are worth retrying.
pub trait RetryPolicy {
    type Request: OutgoingRequest;
    type Response: Clone;

    const NAME: &'static str;

    /// The response carried by `op`, if it is one for this command kind.
    fn response(op: &Op) -> Option<&Self::Response>;

    fn request_id(response: &Self::Response) -> RequestId;

    fn status(response: &Self::Response) -> StatusCode;

    fn message(response: &Self::Response) -> &str;

    /// `None` for terminal statuses.
    fn retry_kind(status: StatusCode) -> Option<RetryKind> {
        match status {
            StatusCode::Timeout => Some(RetryKind::Backoff),
            _ => None,
        }
    }

    fn send(request: &Self::Request, messages: &mut MessagesToSend);
}

macro_rules! response_accessors {
    () => {
        fn request_id(response: &Self::Response) -> RequestId {
            response.request_id
        }

        fn status(response: &Self::Response) -> StatusCode {
            response.status
        }

        fn message(response: &Self::Response) -> &str {
            &response.message
        }
    };
}

pub struct ReserveEntityIdsRetryPolicy;

impl RetryPolicy for ReserveEntityIdsRetryPolicy {
    type Request = ReserveEntityIdsRequest;
    type Response = ReserveEntityIdsResponseOp;

    const NAME: &'static str = "reserve entity ids";

    fn response(op: &Op) -> Option<&Self::Response> {
        match op {
            Op::ReserveEntityIdsResponse(response) => Some(response),
            _ => None,
        }
    }

    response_accessors!();

    fn send(request: &Self::Request, messages: &mut MessagesToSend) {
        messages.reserve_entity_ids_requests.push(request.clone());
    }
}

pub struct CreateEntityRetryPolicy;

impl RetryPolicy for CreateEntityRetryPolicy {
    type Request = CreateEntityRequest;
    type Response = CreateEntityResponseOp;

    const NAME: &'static str = "create entity";

    fn response(op: &Op) -> Option<&Self::Response> {
        match op {
            Op::CreateEntityResponse(response) => Some(response),
            _ => None,
        }
    }

    response_accessors!();

    fn send(request: &Self::Request, messages: &mut MessagesToSend) {
        messages.create_entity_requests.push(request.clone());
    }
}

pub struct DeleteEntityRetryPolicy;

impl RetryPolicy for DeleteEntityRetryPolicy {
    type Request = DeleteEntityRequest;
    type Response = DeleteEntityResponseOp;

    const NAME: &'static str = "delete entity";

    fn response(op: &Op) -> Option<&Self::Response> {
        match op {
            Op::DeleteEntityResponse(response) => Some(response),
            _ => None,
        }
    }

    response_accessors!();

    fn send(request: &Self::Request, messages: &mut MessagesToSend) {
        messages.delete_entity_requests.push(request.clone());
    }
}

pub struct EntityQueryRetryPolicy;

impl RetryPolicy for EntityQueryRetryPolicy {
    type Request = EntityQueryRequest;
    type Response = EntityQueryResponseOp;

    const NAME: &'static str = "entity query";

    fn response(op: &Op) -> Option<&Self::Response> {
        match op {
            Op::EntityQueryResponse(response) => Some(response),
            _ => None,
        }
    }

    response_accessors!();

    fn send(request: &Self::Request, messages: &mut MessagesToSend) {
        messages.entity_query_requests.push(request.clone());
    }
}

/// Entity commands also retry, without delay, when authority over the
/// target component moved while the command was in flight.
pub struct EntityCommandRetryPolicy;

impl RetryPolicy for EntityCommandRetryPolicy {
    type Request = EntityCommandRequest;
    type Response = CommandResponseOp;

    const NAME: &'static str = "entity command";

    fn response(op: &Op) -> Option<&Self::Response> {
        match op {
            Op::CommandResponse(response) => Some(response),
            _ => None,
        }
    }

    response_accessors!();

    fn retry_kind(status: StatusCode) -> Option<RetryKind> {
        match status {
            StatusCode::Timeout => Some(RetryKind::Backoff),
            StatusCode::AuthorityLost => Some(RetryKind::Immediate),
            _ => None,
        }
    }

    fn send(request: &Self::Request, messages: &mut MessagesToSend) {
        messages.entity_command_requests.push(request.clone());
    }
}
