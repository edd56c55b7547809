use std::fmt;

use crate::commands::error::CommandError;

const ATTEMPT_SHIFT: u32 = 48;
const ORIGINAL_MASK: u64 = (1 << ATTEMPT_SHIFT) - 1;

/// Identifies one attempt of a request/response command.
///
/// The low 48 bits hold the id the request was first sent with; the top 16
/// bits hold the attempt number, zero for the first send. A retry id can
/// always be mapped back to the original without any side table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub const MAX_ORIGINAL: u64 = ORIGINAL_MASK;

    /// Creates an original (attempt zero) request id
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit in 48 bits.
    /// Consider using `try_new` for non-panicking error handling.
    pub fn new(value: u64) -> Self {
        Self::try_new(value).expect("request id does not fit in 48 bits")
    }

    pub fn try_new(value: u64) -> Result<Self, CommandError> {
        if value > ORIGINAL_MASK {
            return Err(CommandError::RequestIdOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Reinterprets a raw id as received from the runtime.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub const fn original(&self) -> RequestId {
        RequestId(self.0 & ORIGINAL_MASK)
    }

    pub const fn attempt(&self) -> u16 {
        (self.0 >> ATTEMPT_SHIFT) as u16
    }

    pub const fn is_retry(&self) -> bool {
        self.attempt() != 0
    }

    /// The id for the next attempt of the same request. After `u16::MAX`
    /// the attempt counter wraps to 1, never back to the original id.
    pub fn retry(&self) -> RequestId {
        let next_attempt = match self.attempt() {
            u16::MAX => 1,
            attempt => attempt + 1,
        };
        RequestId((u64::from(next_attempt) << ATTEMPT_SHIFT) | (self.0 & ORIGINAL_MASK))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_retry() {
            write!(f, "{}#{}", self.original().0, self.attempt())
        } else {
            write!(f, "{}", self.0)
        }
    }
}
