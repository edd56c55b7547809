use std::time::Duration;

/// Timing of the cross-call dependency queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossCallConfig {
    /// How long a call waits for unresolved object references before it is
    /// executed anyway.
    pub max_wait: Duration,
    /// How long an executed request id is remembered to drop duplicate
    /// deliveries.
    pub in_flight_window: Duration,
    /// A queued call the executor keeps refusing is dropped after this long.
    pub expire_after: Duration,
}

impl Default for CrossCallConfig {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(1),
            in_flight_window: Duration::from_secs(5),
            expire_after: Duration::from_secs(30),
        }
    }
}
