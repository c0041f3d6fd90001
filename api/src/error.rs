//! Remote failure types
//!
//! Every variant carries the text shown to the user. Non-2xx bodies may
//! carry `message` and/or `error`; both are accepted, and a missing body
//! falls back to a transport-level description.

use serde_json::Value;

use askdb_core::heuristics;

/// Result type for service calls
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Remote failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Non-2xx response
    #[error("{message}")]
    Status { status: u16, message: String },

    /// 2xx response whose envelope reports an error
    #[error("{0}")]
    Rejected(String),

    /// Connection refused, timeout, DNS, ...
    #[error("{0}")]
    Transport(String),

    /// Body could not be understood
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Build the error for a non-2xx response from its raw body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| error_text(&value))
            .unwrap_or_else(|| format!("Request failed with status code {}", status));
        ServiceError::Status { status, message }
    }

    /// True when the text points at a missing or invalid API key
    pub fn is_credential_failure(&self) -> bool {
        heuristics::is_credential_failure(&self.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

/// First usable error description in an envelope: `message`, then `error`
pub(crate) fn error_text(body: &Value) -> Option<String> {
    ["message", "error"].iter().find_map(|key| {
        body.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
