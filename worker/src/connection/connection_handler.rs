use shardview_shared::{MessagesToSend, OpList};

/// The seam between a worker and its transport.
///
/// Implementations own the actual connection, which may live on another
/// thread; the coordinator only ever talks to it through this trait, once
/// per tick.
pub trait ConnectionHandler {
    /// Lets the transport pull in whatever arrived since the last tick.
    fn advance(&mut self) {}

    fn op_list_count(&self) -> usize;

    /// Takes the oldest complete op list, if any.
    fn next_op_list(&mut self) -> Option<OpList>;

    fn send_messages(&mut self, messages: MessagesToSend);

    fn worker_id(&self) -> &str;

    fn worker_attributes(&self) -> &[String];
}
