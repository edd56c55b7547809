pub mod command;
pub mod entity_query;
pub mod messages_to_send;
pub mod outgoing;
