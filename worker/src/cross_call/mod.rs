mod cross_call_config;
pub use cross_call_config::CrossCallConfig;

mod cross_call_handler;
pub use cross_call_handler::{CrossCallHandler, QueuedCrossCall};

mod error;
pub use error::CrossCallError;

mod rpc_executor;
pub use rpc_executor::{CrossCallParams, ObjectRef, RpcExecutor, RpcPayload};
