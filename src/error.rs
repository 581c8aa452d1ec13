/// Error types for Record Bridge
///
/// Every failure a backend call can produce is typed here. None of these
/// reach the UI: the bridge logs them and answers with the fixed failure
/// payload of the operation.

use thiserror::Error;

/// Main error type for Record Bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================
    // Authentication Errors
    // ========================================

    #[error("Authentication rejected for '{identifier}': {reason}")]
    AuthRejected {
        identifier: String,
        reason: String,
    },

    #[error("Not signed in")]
    NotSignedIn,

    // ========================================
    // Backend Errors
    // ========================================

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("Malformed backend document: {0}")]
    MalformedDocument(String),

    #[error("Record '{id}' not found")]
    RecordNotFound {
        id: String,
    },

    #[error("Backend unavailable")]
    Unavailable,

    // ========================================
    // Configuration Errors
    // ========================================

    #[error("Invalid config for field '{field}': {reason}")]
    ConfigError {
        field: String,
        reason: String,
    },

    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ========================================
    // IO / Serialization Errors
    // ========================================

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Whether this error means the record simply does not exist
    ///
    /// Only used for logging; the UI never sees the difference.
    pub fn is_not_found(&self) -> bool {
        match self {
            BridgeError::RecordNotFound { .. } => true,
            BridgeError::Status { status, .. } => *status == 404,
            _ => false,
        }
    }
}

/// Result type alias for Record Bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

// ========================================
// Unit Tests
// ========================================
