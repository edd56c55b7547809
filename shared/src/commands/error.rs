use thiserror::Error;

use crate::RequestId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("request id {value} does not fit in the 48 bits reserved for original ids")]
    RequestIdOutOfRange { value: u64 },

    #[error("request {request_id} is already outstanding")]
    DuplicateRequest { request_id: RequestId },

    #[error("request id {request_id} is a retry id (attempt {attempt}); new requests must use an original id")]
    RetryIdForNewRequest { request_id: RequestId, attempt: u16 },
}
