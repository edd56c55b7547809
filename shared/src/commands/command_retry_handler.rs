use std::{collections::BTreeMap, marker::PhantomData, time::Duration};

use log::{debug, info, trace, warn};

use crate::{
    commands::{
        error::CommandError,
        retry_config::{RetryConfig, RetryLimit},
        retry_policy::{RetryKind, RetryPolicy},
    },
    messages::outgoing::OutgoingRequest,
    MessagesToSend, Op, RequestId, StatusCode, WorkerView,
};

/// Terminal result of a command, reported exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutcome<R> {
    /// The id the command was first sent with.
    pub request_id: RequestId,
    pub status: StatusCode,
    pub message: String,
    /// Total number of sends, the first one included.
    pub attempts: u32,
    pub response: R,
}

impl<R> CommandOutcome<R> {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CommandState {
    Sent,
    AwaitingRetry { retry_at: Duration },
}

struct OutstandingCommand<R> {
    request: R,
    current_id: RequestId,
    limit: RetryLimit,
    attempts: u32,
    state: CommandState,
}

/// Tracks outstanding commands of one kind and resends them on transient
/// failure.
///
/// Retries go out under a new id derived from the original with
/// `RequestId::retry`, so responses to superseded attempts can be told
/// apart and ignored.
pub struct CommandRetryHandler<P: RetryPolicy> {
    config: RetryConfig,
    clock: Duration,
    outstanding: BTreeMap<RequestId, OutstandingCommand<P::Request>>,
    phantom_p: PhantomData<P>,
}

impl<P: RetryPolicy> Default for CommandRetryHandler<P> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<P: RetryPolicy> CommandRetryHandler<P> {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            clock: Duration::ZERO,
            outstanding: BTreeMap::new(),
            phantom_p: PhantomData,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_outstanding(&self, request_id: RequestId) -> bool {
        self.outstanding.contains_key(&request_id.original())
    }

    /// Records the request and buffers it for sending
    ///
    /// # Panics
    ///
    /// Panics if the request id is a retry id or already outstanding.
    /// Consider using `try_send_request` for non-panicking error handling.
    pub fn send_request(
        &mut self,
        request: P::Request,
        limit: RetryLimit,
        messages: &mut MessagesToSend,
    ) {
        if let Err(err) = self.try_send_request(request, limit, messages) {
            panic!("cannot send {} request: {}", P::NAME, err);
        }
    }

    pub fn try_send_request(
        &mut self,
        request: P::Request,
        limit: RetryLimit,
        messages: &mut MessagesToSend,
    ) -> Result<(), CommandError> {
        let request_id = request.request_id();
        if request_id.is_retry() {
            return Err(CommandError::RetryIdForNewRequest {
                request_id,
                attempt: request_id.attempt(),
            });
        }
        if self.outstanding.contains_key(&request_id) {
            return Err(CommandError::DuplicateRequest { request_id });
        }

        P::send(&request, messages);
        self.outstanding.insert(
            request_id,
            OutstandingCommand {
                request,
                current_id: request_id,
                limit,
                attempts: 1,
                state: CommandState::Sent,
            },
        );
        trace!("sent {} request {}", P::NAME, request_id);
        Ok(())
    }

    /// Stops tracking a command. A response arriving later is ignored.
    pub fn cancel(&mut self, request_id: RequestId) -> bool {
        let cancelled = self.outstanding.remove(&request_id.original()).is_some();
        if cancelled {
            debug!("cancelled {} request {}", P::NAME, request_id.original());
        }
        cancelled
    }

    /// Advances the clock by `delta_time`, resends every command whose
    /// backoff has elapsed, then consumes responses in `ops`. Returns the
    /// commands that reached a terminal state.
    pub fn process_ops(
        &mut self,
        delta_time: Duration,
        ops: &[Op],
        messages: &mut MessagesToSend,
    ) -> Vec<CommandOutcome<P::Response>> {
        self.clock += delta_time;
        self.resend_due(messages);

        let mut outcomes = Vec::new();
        for op in ops {
            let Some(response) = P::response(op) else {
                continue;
            };
            if let Some(outcome) = self.handle_response(response, messages) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Same as `process_ops`, reading responses from the current delta of
    /// `worker_view` and buffering resends in its outgoing messages.
    pub fn process_view_delta(
        &mut self,
        delta_time: Duration,
        worker_view: &mut WorkerView,
    ) -> Vec<CommandOutcome<P::Response>> {
        let (delta, messages) = worker_view.delta_and_messages();
        self.process_ops(delta_time, delta.worker_messages(), messages)
    }

    fn resend_due(&mut self, messages: &mut MessagesToSend) {
        let clock = self.clock;
        for command in self.outstanding.values_mut() {
            if let CommandState::AwaitingRetry { retry_at } = command.state {
                if retry_at <= clock {
                    resend::<P>(command, messages);
                }
            }
        }
    }

    fn handle_response(
        &mut self,
        response: &P::Response,
        messages: &mut MessagesToSend,
    ) -> Option<CommandOutcome<P::Response>> {
        let response_id = P::request_id(response);
        let original_id = response_id.original();

        let Some(command) = self.outstanding.get_mut(&original_id) else {
            trace!("ignoring {} response {} for unknown request", P::NAME, response_id);
            return None;
        };
        if command.current_id != response_id || command.state != CommandState::Sent {
            debug!(
                "ignoring stale {} response {} (current attempt is {})",
                P::NAME,
                response_id,
                command.current_id
            );
            return None;
        }

        let status = P::status(response);
        if !status.is_success() {
            if let Some(kind) = P::retry_kind(status) {
                if command.limit.allows_another_attempt(command.attempts) {
                    match kind {
                        RetryKind::Immediate => {
                            info!(
                                "{} request {} failed with {}, retrying immediately",
                                P::NAME,
                                original_id,
                                status
                            );
                            resend::<P>(command, messages);
                        }
                        RetryKind::Backoff => {
                            let delay = self.config.delay_for(command.attempts);
                            info!(
                                "{} request {} failed with {}, retrying in {:?}",
                                P::NAME,
                                original_id,
                                status,
                                delay
                            );
                            command.state = CommandState::AwaitingRetry {
                                retry_at: self.clock + delay,
                            };
                        }
                    }
                    return None;
                }
                warn!(
                    "{} request {} failed with {} after {} attempt(s), giving up",
                    P::NAME,
                    original_id,
                    status,
                    command.attempts
                );
            }
        }

        let command = self.outstanding.remove(&original_id)?;
        Some(CommandOutcome {
            request_id: original_id,
            status,
            message: P::message(response).to_string(),
            attempts: command.attempts,
            response: response.clone(),
        })
    }
}

fn resend<P: RetryPolicy>(command: &mut OutstandingCommand<P::Request>, messages: &mut MessagesToSend) {
    command.current_id = command.current_id.retry();
    command.attempts += 1;
    command.state = CommandState::Sent;
    command.request.set_request_id(command.current_id);
    P::send(&command.request, messages);
    trace!("resent {} request as {}", P::NAME, command.current_id);
}
