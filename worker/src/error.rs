use thiserror::Error;

use shardview_shared::{CommandError, DispatchError, ViewError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("op batch rejected: {0}")]
    View(#[from] ViewError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
