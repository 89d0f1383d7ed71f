pub mod google;
pub mod mock;
pub mod openai_compatible; // Used for OpenAI and DeepSeek

pub use google::GoogleProvider;
pub use mock::MockProvider;
pub use openai_compatible::{OpenAICompatibleProvider, ProviderIdentity, identities};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// The closed set of providers a request may be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    DeepSeek,
    Mock,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Mock => "mock",
        }
    }

    pub fn from_name(name: &str) -> Option<ProviderKind> {
        let candidate = name.to_ascii_lowercase();
        ProviderKind::iter().find(|kind| kind.as_str() == candidate)
    }

    /// Providers that need credentials and talk to a remote API.
    pub fn remote() -> impl Iterator<Item = ProviderKind> {
        ProviderKind::iter().filter(|kind| *kind != ProviderKind::Mock)
    }

    /// Environment variable expected to contain the provider API key.
    pub fn env_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderKind::Mock => None,
        }
    }

    /// Environment variable that overrides the default endpoint.
    pub fn base_url_env_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("OPENAI_BASE_URL"),
            ProviderKind::Gemini => Some("GEMINI_BASE_URL"),
            ProviderKind::DeepSeek => Some("DEEPSEEK_BASE_URL"),
            ProviderKind::Mock => None,
        }
    }
}

/// Build a reqwest client that enforces the configured request timeout.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, crate::LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| crate::LlmError::configuration(format!("Failed to build HTTP client: {e}")))
}

/// Map a transport failure, reporting timeouts with the client's configured limit.
pub(crate) fn transport_error(err: reqwest::Error, timeout: std::time::Duration) -> crate::LlmError {
    if err.is_timeout() {
        crate::LlmError::timeout(timeout)
    } else {
        err.into()
    }
}

/// Apply a header map from [`crate::config::ProviderConfig::headers`] to a request.
pub(crate) fn with_headers(
    mut req: reqwest::RequestBuilder,
    headers: &std::collections::HashMap<String, String>,
) -> reqwest::RequestBuilder {
    for (key, value) in headers {
        req = req.header(key, value);
    }
    req
}

/// Map a non-success HTTP status and body to an [`crate::LlmError`].
pub(crate) fn status_error(
    provider: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> crate::LlmError {
    use crate::LlmError;

    // Providers wrap the reason in {"error": {"message": ...}}
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            LlmError::authentication(format!("Invalid {provider} API key: {message}"))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::rate_limit(message),
        reqwest::StatusCode::BAD_REQUEST => {
            LlmError::validation(format!("Bad request: {message}"))
        }
        _ => LlmError::api(
            provider,
            format!("API Error: {status} - {message}"),
            Some(status.as_str().to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmError;

    #[test]
    fn provider_names_round_trip() {
        for kind in ProviderKind::iter() {
            assert_eq!(ProviderKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::from_name("OpenAI"), Some(ProviderKind::OpenAI));
        assert_eq!(ProviderKind::from_name("anthropic"), None);
    }

    #[test]
    fn provider_kind_serde_uses_wire_names() {
        let kinds: Vec<ProviderKind> =
            serde_json::from_str(r#"["openai","gemini","deepseek","mock"]"#).unwrap();
        assert_eq!(kinds, ProviderKind::iter().collect::<Vec<_>>());
        assert_eq!(
            serde_json::to_string(&ProviderKind::DeepSeek).unwrap(),
            r#""deepseek""#
        );
    }

    #[test]
    fn only_mock_lacks_credentials() {
        assert_eq!(ProviderKind::remote().count(), 3);
        assert!(ProviderKind::Mock.env_key().is_none());
        assert_eq!(ProviderKind::Gemini.env_key(), Some("GEMINI_API_KEY"));
    }

    #[test]
    fn status_errors_are_classified() {
        let err = status_error("openai", reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert!(matches!(err, LlmError::Authentication { .. }));

        let err = status_error("openai", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, LlmError::RateLimit { .. }));

        let err = status_error(
            "gemini",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":{"message":"backend exploded"}}"#,
        );
        match err {
            LlmError::Api { provider, message, code } => {
                assert_eq!(provider, "gemini");
                assert!(message.contains("backend exploded"));
                assert_eq!(code.as_deref(), Some("500"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
