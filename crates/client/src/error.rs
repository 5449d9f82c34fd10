//! Unified error handling.
//!
//! Provides a unified `AppError` for callers that drive the whole client
//! (configuration, storage and API calls) and want a single error type.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::store::StorageError;

/// Application-level error type for the cart client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Cart storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Shop API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Bad input from the caller.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the error came from the caller's input or session rather than
    /// from the client or backend misbehaving.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest(_)
                | Self::Config(_)
                | Self::Api(ApiError::NotFound(_) | ApiError::Unauthorized(_))
        )
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("quantity must be greater than 0".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be greater than 0");

        let err = AppError::from(ApiError::NotFound("cart item not found".to_string()));
        assert_eq!(err.to_string(), "API error: Not found: cart item not found");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(AppError::BadRequest("x".to_string()).is_user_error());
        assert!(AppError::from(ApiError::Unauthorized("x".to_string())).is_user_error());
        assert!(!AppError::from(ApiError::Validation("x".to_string())).is_user_error());
        assert!(
            !AppError::from(ApiError::Remote {
                status: 500,
                message: "x".to_string()
            })
            .is_user_error()
        );
    }
}
