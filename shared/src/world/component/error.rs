use thiserror::Error;

use crate::ComponentId;

/// Errors that can occur when combining component payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// An update was applied to, or merged with, a payload of another component type
    #[error("Component payload mismatch: expected component {expected}, got component {actual}")]
    MismatchedComponent {
        expected: ComponentId,
        actual: ComponentId,
    },
}
