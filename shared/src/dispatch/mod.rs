//! # Dispatch
//! Per-component callback registrations fed from each tick's `ViewDelta`.

pub mod callbacks;
pub mod dispatcher;
pub mod error;
