//! AI Content Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::generative::ContentType;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// Required credentials for a provider are missing.
    #[error("Authentication failed for provider '{provider}': API key is not configured")]
    Authentication { provider: String },

    /// The remote call failed or returned something unusable.
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    // =========================================================================
    // Registry Errors
    // =========================================================================
    #[error("No {content_type} provider registered under '{name}'")]
    ProviderNotFound {
        content_type: ContentType,
        name: String,
    },

    #[error("A {content_type} provider is already registered under '{name}'")]
    ProviderAlreadyRegistered {
        content_type: ContentType,
        name: String,
    },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Creates an authentication error for a provider
    pub fn authentication(provider: impl Into<String>) -> Self {
        CoreError::Authentication {
            provider: provider.into(),
        }
    }

    /// Creates a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Narrows any error to the two kinds an adapter may surface.
    ///
    /// `Authentication` and `Provider` pass through unchanged; everything else
    /// becomes a `Provider` error carrying the original message.
    pub fn into_provider_error(self, provider: &str) -> Self {
        match self {
            err @ (CoreError::Authentication { .. } | CoreError::Provider { .. }) => err,
            CoreError::Io(e) => CoreError::provider(provider, e.to_string()),
            CoreError::Json(e) => CoreError::provider(provider, e.to_string()),
            CoreError::Config(msg) => CoreError::provider(provider, msg),
            other => CoreError::provider(provider, other.to_string()),
        }
    }

    /// Returns true for errors that can only be fixed by changing configuration
    pub fn is_authentication(&self) -> bool {
        matches!(self, CoreError::Authentication { .. })
    }

    /// Returns the provider name attached to the error, if any
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            CoreError::Authentication { provider } | CoreError::Provider { provider, .. } => {
                Some(provider)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_message_names_provider() {
        let err = CoreError::authentication("loudly");
        assert_eq!(
            err.to_string(),
            "Authentication failed for provider 'loudly': API key is not configured"
        );
        assert!(err.is_authentication());
        assert_eq!(err.provider_name(), Some("loudly"));
    }

    #[test]
    fn test_into_provider_error_keeps_declared_kinds() {
        let auth = CoreError::authentication("veo").into_provider_error("veo");
        assert!(matches!(auth, CoreError::Authentication { .. }));

        let provider = CoreError::provider("veo", "500 boom").into_provider_error("other");
        match provider {
            CoreError::Provider { provider, message } => {
                assert_eq!(provider, "veo");
                assert_eq!(message, "500 boom");
            }
            _ => panic!("Expected Provider error"),
        }
    }

    #[test]
    fn test_into_provider_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = CoreError::from(io).into_provider_error("imagen");
        match err {
            CoreError::Provider { provider, message } => {
                assert_eq!(provider, "imagen");
                assert!(message.contains("read-only"));
            }
            _ => panic!("Expected Provider error"),
        }
    }

    #[test]
    fn test_registry_error_messages() {
        let err = CoreError::ProviderNotFound {
            content_type: ContentType::Video,
            name: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "No video provider registered under 'nope'");
        assert!(err.provider_name().is_none());
    }
}
