pub mod component_data;
pub mod error;
