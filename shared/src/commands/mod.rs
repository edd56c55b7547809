pub mod command_retry_handler;
pub mod error;
pub mod request_id;
pub mod retry_config;
pub mod retry_policy;
