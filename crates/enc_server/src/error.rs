//! Error types for the server runtime.

use enc_core::CoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server runtime.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration is missing, malformed, or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS material could not be generated or written.
    #[error("cannot write TLS material: {0}")]
    CertificateWriteFailure(String),

    /// A certificate could not be read or parsed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// A scheduled task handler failed.
    #[error("task {task} failed: {message}")]
    TaskHandlerFailure {
        /// Name of the task.
        task: String,
        /// Description of the failure.
        message: String,
    },

    /// Store engine error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No route matches the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a task handler failure.
    pub fn task_failure(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskHandlerFailure {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::InvalidRequest(_) | ServerError::NotFound(_) => true,
            ServerError::Core(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Suggested HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::Core(e) if e.is_not_found() => 404,
            _ => 500,
        }
    }
}
