//! BackendError - Failures surfaced by a store
//!
//! TigerStyle: Explicit variants, constructor helpers, no silent swallowing.
//!
//! "Not found" is never an error: `load` answers `Ok(None)` and `list` an
//! empty vector.

/// The backend could not complete an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("read error: {message}")]
    Read { message: String },

    #[error("write error: {message}")]
    Write { message: String },

    #[error("{backend} does not support {operation}")]
    Unsupported { backend: String, operation: String },

    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("invalid entity: {message}")]
    InvalidEntity { message: String },

    #[error("injected fault on {operation}")]
    Injected { operation: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl BackendError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    pub fn unsupported(backend: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            backend: backend.into(),
            operation: operation.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn invalid_entity(message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            message: message.into(),
        }
    }

    pub fn injected(operation: impl Into<String>) -> Self {
        Self::Injected {
            operation: operation.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result of a store operation.
pub type BackendResult<T> = Result<T, BackendError>;
