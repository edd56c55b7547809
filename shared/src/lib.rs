//! # Shardview Shared
//! The local entity view, its per-tick deltas, callback dispatch and command
//! retries. Everything here is transport agnostic; `shardview-worker` wires
//! it to a connection.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod commands;
mod dispatch;
mod messages;
mod ops;
mod types;
mod world;

pub use commands::{
    command_retry_handler::{CommandOutcome, CommandRetryHandler},
    error::CommandError,
    request_id::RequestId,
    retry_config::{RetryConfig, RetryLimit},
    retry_policy::{
        CreateEntityRetryPolicy, DeleteEntityRetryPolicy, EntityCommandRetryPolicy,
        EntityQueryRetryPolicy, ReserveEntityIdsRetryPolicy, RetryKind, RetryPolicy,
    },
};
pub use dispatch::{
    callbacks::{AuthorityCallback, CallbackId, CallbackKind, CallbackRemover, ComponentCallback},
    dispatcher::Dispatcher,
    error::DispatchError,
};
pub use messages::{
    command::{CommandRequest, CommandResponse},
    entity_query::{EntityQuery, QueryConstraint},
    messages_to_send::MessagesToSend,
    outgoing::{
        CreateEntityRequest, DeleteEntityRequest, EntityCommandFailure, EntityCommandRequest,
        EntityCommandResponse, EntityQueryRequest, LogMessage, Metrics, OutgoingComponentMessage,
        OutgoingRequest, ReserveEntityIdsRequest,
    },
};
pub use ops::{
    op::{
        CommandRequestOp, CommandResponseOp, CreateEntityResponseOp, DeleteEntityResponseOp,
        DisconnectOp, EntityQueryResponseOp, Op, OpList, OpType, QueriedEntity,
        ReserveEntityIdsResponseOp,
    },
    op_list_builder::OpListBuilder,
    status_code::StatusCode,
};
pub use types::{CommandIndex, ComponentId, EntityId, FieldId};
pub use world::{
    component::{
        component_data::{ComponentData, ComponentUpdate, FieldMap},
        error::ComponentError,
    },
    delta::{
        entity_delta::{ComponentChange, EntityComponentChange, EntityDelta, EntityDeltaKind},
        error::ViewError,
        view_delta::ViewDelta,
    },
    entity_view::{Authority, EntityView, EntityViewElement},
    sub_view::{FilterPredicate, RefreshTrigger, SubView},
    worker_view::WorkerView,
};
