pub mod op;
pub mod op_list_builder;
pub mod status_code;
