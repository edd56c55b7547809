mod view_coordinator;
pub use view_coordinator::{SubViewId, ViewCoordinator};

mod worker_config;
pub use worker_config::WorkerConfig;
