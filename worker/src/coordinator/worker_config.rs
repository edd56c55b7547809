use std::default::Default;

use shardview_shared::RetryConfig;

use crate::cross_call::CrossCallConfig;

/// Contains Config properties which will be used by a worker
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Backoff for every retry handler created by the coordinator
    pub retry: RetryConfig,
    /// Timing of the cross-call dependency queue
    pub cross_call: CrossCallConfig,
    /// Flush buffered messages to the connection when the coordinator is
    /// dropped
    pub flush_on_drop: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            cross_call: CrossCallConfig::default(),
            flush_on_drop: true,
        }
    }
}
