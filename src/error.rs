//! Error types for the Grid provider.

use thiserror::Error;

use crate::client::ApiError;
use crate::schema::Diagnostic;

/// Errors that can occur while managing Grid objects.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found on the appliance.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Authentication or authorization against the appliance failed.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The appliance could not be reached or is temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not supported for this object type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The appliance rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other non-success HTTP status returned by the appliance.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error text.
        message: String,
    },
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::AlreadyExists(msg)
            | Self::PermissionDenied(msg)
            | Self::Unavailable(msg)
            | Self::FailedPrecondition(msg)
            | Self::Unimplemented(msg)
            | Self::InvalidRequest(msg) => msg,
            Self::Api { message, .. } => message,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }

    /// Whether this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => match status {
                404 => ProviderError::NotFound(body),
                401 | 403 => ProviderError::PermissionDenied(body),
                409 => ProviderError::AlreadyExists(body),
                503 => ProviderError::Unavailable(body),
                400 => ProviderError::InvalidRequest(body),
                _ => ProviderError::Api {
                    status,
                    message: body,
                },
            },
            ApiError::Transport(err) => ProviderError::Unavailable(err.to_string()),
            ApiError::Decode(msg) => ProviderError::InvalidRequest(msg),
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string());
        match err {
            ProviderError::Configuration(_) => {
                diagnostic.with_detail("Check the provider configuration block")
            }
            ProviderError::PermissionDenied(_) => {
                diagnostic.with_detail("Check the appliance credentials and the user's permissions")
            }
            _ => diagnostic,
        }
    }
}
