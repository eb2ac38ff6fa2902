//! Error types for the cafe-hop service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific cafe-hop scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CafeHopError {
    #[error("Comparison references unknown opponent: {opponent_id}")]
    MissingOpponent { opponent_id: String },

    #[error("Invalid comparison outcome {value}: expected one of 0, 0.5, 1")]
    InvalidOutcome { value: f64 },

    #[error("Invalid upload request: {reason}")]
    InvalidUploadRequest { reason: String },

    #[error("Cafe not found: {cafe_id}")]
    CafeNotFound { cafe_id: String },

    #[error("Invalid transit data: {reason}")]
    TransitDataInvalid { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl CafeHopError {
    /// Whether the error was caused by the client's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CafeHopError::MissingOpponent { .. }
                | CafeHopError::InvalidOutcome { .. }
                | CafeHopError::InvalidUploadRequest { .. }
                | CafeHopError::CafeNotFound { .. }
        )
    }
}

/// Classify an arbitrary error; anything that is not a [`CafeHopError`] is a
/// service error
pub fn is_client_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CafeHopError>()
        .is_some_and(CafeHopError::is_client_error)
}
