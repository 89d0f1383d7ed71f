use std::time::Duration;
use thiserror::Error;

/// Main error type for provider dispatch and configuration
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network-related errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String },

    /// Provider-specific API errors
    #[error("API error from {provider}: {message}")]
    Api {
        provider: String,
        message: String,
        code: Option<String>,
    },

    /// Configuration errors (missing credentials, unreadable config file, ...)
    #[error("{message}")]
    Configuration { message: String },

    /// Validation errors for requests
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Timeout errors
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LlmError {
    /// Create a network error with source
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    /// Create an API error
    pub fn api(
        provider: impl Into<String>,
        message: impl Into<String>,
        code: Option<String>,
    ) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a serialization error
    pub fn serialization(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Error raised when a provider is selected but its API key is absent.
    pub fn missing_api_key(env_key: &str) -> Self {
        Self::configuration(format!(
            "{env_key} is not set. Please add it to your environment or switch provider to 'mock'."
        ))
    }
}

/// Convert from reqwest errors. Timeouts carry no duration here; providers
/// report them through `providers::transport_error` with their own limit.
impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::network_with_source("Request timed out", err)
        } else if err.is_connect() {
            LlmError::network_with_source("Connection failed", err)
        } else if err.is_request() {
            LlmError::validation(format!("Invalid request: {err}"))
        } else {
            LlmError::network_with_source("HTTP request failed", err)
        }
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::serialization("JSON serialization failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_message_names_the_variable() {
        let err = LlmError::missing_api_key("OPENAI_API_KEY");
        let message = err.to_string();
        assert!(message.starts_with("OPENAI_API_KEY is not set."));
        assert!(message.contains("'mock'"));
        assert!(matches!(err, LlmError::Configuration { .. }));
    }

    #[test]
    fn api_error_display_includes_provider() {
        let err = LlmError::api("deepseek", "API Error: 500 - boom", Some("500".into()));
        assert_eq!(
            err.to_string(),
            "API error from deepseek: API Error: 500 - boom"
        );
    }
}
