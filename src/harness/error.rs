//! Step failures: backend errors and assertion violations

use crate::storage::BackendError;

/// A conformance check did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({file}:{line})")]
pub struct AssertionViolation {
    /// What was expected and what was observed
    pub message: String,
    /// Source file of the check
    pub file: &'static str,
    /// Source line of the check
    pub line: u32,
}

impl AssertionViolation {
    pub fn new(message: impl Into<String>, file: &'static str, line: u32) -> Self {
        Self {
            message: message.into(),
            file,
            line,
        }
    }
}

/// Why a step failed. Surfaced unchanged as the suite outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuiteError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionViolation),
}

impl SuiteError {
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}
