use thiserror::Error;

/// Failure of a single call to the detection service.
///
/// These never reach exam or dashboard code: the detection client turns
/// every variant into a sentinel value and a log line.
#[derive(Debug, Error)]
pub enum ServiceError {
    // ============================================================
    // Transport Errors
    // ============================================================
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    // ============================================================
    // Protocol Errors
    // ============================================================
    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Operation not supported by this service: {0}")]
    NotSupported(String),

    // ============================================================
    // Configuration Errors
    // ============================================================
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

impl ServiceError {
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ServiceError::Transport { endpoint, .. }
            | ServiceError::Timeout { endpoint }
            | ServiceError::Status { endpoint, .. }
            | ServiceError::Decode { endpoint, .. } => Some(endpoint),
            ServiceError::NotSupported(_) | ServiceError::InvalidUrl(_) => None,
        }
    }
}
