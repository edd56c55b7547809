use std::fmt;

/// Result of a request/response command as reported by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    /// The request did not complete in time. Always safe to retry.
    Timeout,
    /// The target entity or component could not be found.
    NotFound,
    /// The worker holding authority changed while the request was in flight.
    AuthorityLost,
    PermissionDenied,
    /// The receiving application rejected the request.
    ApplicationError,
    InternalError,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "success",
            StatusCode::Timeout => "timeout",
            StatusCode::NotFound => "not found",
            StatusCode::AuthorityLost => "authority lost",
            StatusCode::PermissionDenied => "permission denied",
            StatusCode::ApplicationError => "application error",
            StatusCode::InternalError => "internal error",
        };
        f.write_str(name)
    }
}
