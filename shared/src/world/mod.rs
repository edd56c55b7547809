pub mod component;
pub mod delta;
pub mod entity_view;
pub mod sub_view;
pub mod worker_view;
