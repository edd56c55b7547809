//! # Shardview Worker
//! Runs a shardview worker tick by tick: a `ViewCoordinator` pulls op lists
//! from a `ConnectionHandler`, updates the local view and dispatches
//! callbacks, while a `CrossCallHandler` defers incoming cross calls until
//! the objects they need are in the view.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use shardview_shared::*;
}

mod connection;
mod coordinator;
mod cross_call;
mod error;

pub use connection::ConnectionHandler;
pub use coordinator::{SubViewId, ViewCoordinator, WorkerConfig};
pub use cross_call::{
    CrossCallConfig, CrossCallError, CrossCallHandler, CrossCallParams, ObjectRef, QueuedCrossCall,
    RpcExecutor, RpcPayload,
};
pub use error::CoordinatorError;
