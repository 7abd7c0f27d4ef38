use thiserror::Error;

/// Result alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Snapshot or trajectory output failed. Fatal, never retried.
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was stopped through the interrupt flag.
    #[error("interrupted")]
    Interrupted,
}
