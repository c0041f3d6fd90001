//! Local failure taxonomy
//!
//! Every variant here is detected client-side, before any network call.
//! Remote failures live in `askdb-api` and are folded into the message log
//! by the controller instead of being returned.

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Locally blocked actions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A required field was blank
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Action attempted out of order (connect before authorize, execute with
    /// nothing pending, ...)
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Another operation is still outstanding
    #[error("Busy: {0} is still in progress")]
    Busy(String),
}

impl SessionError {
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionError::Busy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::InvalidInput("API key is blank".to_string());
        assert_eq!(format!("{}", err), "Invalid input: API key is blank");

        let err = SessionError::Busy("ask".to_string());
        assert_eq!(format!("{}", err), "Busy: ask is still in progress");
        assert!(err.is_busy());
    }
}
