//! Custom error types for shopfilter.
//!
//! All library functions return `Result<T, ShopFilterError>` instead of using `unwrap()`.
//! The HTTP layer decides the status code from the variant: [`ShopFilterError::Validation`]
//! is a client error, everything else is reported as an upstream/integration failure.

use thiserror::Error;

/// Main error type for shopfilter operations.
#[derive(Debug, Error)]
pub enum ShopFilterError {
    /// Network/HTTP request error talking to the model provider
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Model provider returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code from the provider
        code: u16,
        /// Error message from the provider
        message: String,
    },

    /// Response body could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Caller supplied missing or out-of-domain input
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ShopFilterError {
    /// True when the caller, not the upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ShopFilterError::Validation(_))
    }
}

/// Result type alias using `ShopFilterError`
pub type Result<T> = std::result::Result<T, ShopFilterError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a validation error message
    fn ok_or_validation(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_validation(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ShopFilterError::Validation(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_client_error() {
        let err = ShopFilterError::Validation("current_query is required".to_string());
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Validation error: current_query is required");
    }

    #[test]
    fn test_api_error_is_not_client_error() {
        let err = ShopFilterError::Api {
            code: 502,
            message: "bad gateway".to_string(),
        };
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "API error: 502 - bad gateway");
    }

    #[test]
    fn test_ok_or_validation() {
        let missing: Option<&str> = None;
        let err = missing.ok_or_validation("prompt is required").expect_err("should fail");
        assert!(err.is_client_error());
        assert_eq!(Some(3).ok_or_validation("unused").expect("should succeed"), 3);
    }
}
