//! Error types for LoomQL

use thiserror::Error;

/// Main error type for LoomQL operations
#[derive(Error, Debug)]
pub enum LoomError {
    /// Configuration file parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Schema fragment or resolver module could not be loaded
    #[error("Load error: {0}")]
    Load(String),

    /// Assembled schema could not be compiled into an executable schema
    #[error("Schema build failed: {0}")]
    SchemaBuild(String),

    /// Malformed request on the GraphQL route
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body exceeded the configured limit
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// HTTP method not accepted on the GraphQL route
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Request arrived before the service instance was ready
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Cache store failure
    #[error("Store error: {0}")]
    Store(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoomError {
    /// Returns true if this error should be logged at error level
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LoomError::Load(_)
                | LoomError::SchemaBuild(_)
                | LoomError::Store(_)
                | LoomError::Server(_)
                | LoomError::Internal(_)
        )
    }

    /// Returns true if this error is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LoomError::BadRequest(_) | LoomError::PayloadTooLarge(_) | LoomError::MethodNotAllowed(_)
        )
    }

    /// Returns the appropriate HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LoomError::BadRequest(_) => 400,
            LoomError::MethodNotAllowed(_) => 405,
            LoomError::PayloadTooLarge(_) => 413,
            LoomError::ServiceUnavailable(_) => 503,
            _ => 500,
        }
    }

    /// Machine-readable code placed in GraphQL error extensions
    pub fn code(&self) -> &'static str {
        match self {
            LoomError::BadRequest(_) => "BAD_REQUEST",
            LoomError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            LoomError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            LoomError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Sanitize the error message to avoid leaking sensitive information
    pub fn sanitized_message(&self) -> String {
        match self {
            // Store URLs may carry credentials
            LoomError::Store(_) => "Cache store error".to_string(),

            LoomError::Internal(_) | LoomError::Io(_) => "Internal server error".to_string(),

            LoomError::BadRequest(msg) => msg.clone(),
            LoomError::ServiceUnavailable(_) => "GraphQL service is not ready".to_string(),

            _ => self.to_string(),
        }
    }
}

/// Result type alias using LoomError
pub type Result<T> = std::result::Result<T, LoomError>;
