use thiserror::Error;

use shardview_shared::{EntityId, RequestId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrossCallError {
    #[error("cross call {request_id} is already queued or in flight")]
    Duplicate { request_id: RequestId },

    #[error("cross call {request_id} targets entity {entity_id}, which is not in the view")]
    UnknownTarget {
        request_id: RequestId,
        entity_id: EntityId,
    },
}
