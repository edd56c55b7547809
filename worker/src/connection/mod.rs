mod connection_handler;
pub use connection_handler::ConnectionHandler;
