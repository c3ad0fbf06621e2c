//! Closed error-kind sets for each subsystem, rolling up into [`CoreError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("io: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned an error (status {status_code}): {message}")]
    Upstream {
        status_code: u16,
        code: Option<String>,
        message: String,
    },
    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("unknown tool: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("tool returned an error: {0}")]
    ToolError(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// The closed error-kind set the core distinguishes, per the error-handling design.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("provider error: {message}")]
    ProviderError {
        status_code: Option<u16>,
        message: String,
    },
    #[error("attachment not ready: {0}")]
    AttachmentNotReady(String),
    #[error("tool execution failed: {0}")]
    ToolExecError(String),
    #[error("approval timed out")]
    ApprovalTimeout,
    #[error("tool loop limit exceeded")]
    ToolLoopLimit,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => CoreError::NotFound("row not found".to_string()),
            StoreError::Conflict(m) => CoreError::Conflict(m),
            StoreError::Constraint(m) => CoreError::Internal(format!("constraint: {m}")),
            StoreError::Io(m) => CoreError::Internal(format!("store io: {m}")),
        }
    }
}

impl From<ProviderError> for CoreError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Upstream {
                status_code,
                message,
                ..
            } => CoreError::ProviderError {
                status_code: Some(status_code),
                message,
            },
            ProviderError::Timeout(d) => CoreError::ProviderError {
                status_code: None,
                message: format!("timed out after {d:?}"),
            },
            ProviderError::Transport(m) => CoreError::ProviderError {
                status_code: None,
                message: m,
            },
        }
    }
}

impl From<ToolSourceError> for CoreError {
    fn from(e: ToolSourceError) -> Self {
        CoreError::ToolExecError(e.to_string())
    }
}
