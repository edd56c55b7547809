use thiserror::Error;

use crate::CallbackId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no callback registered with id {callback_id}")]
    CallbackNotFound { callback_id: CallbackId },
}
