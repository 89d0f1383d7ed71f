use crate::config::{OpenAICompatibleConfig, ProviderConfig};
use crate::error::LlmError;
use crate::types::{ChatProvider, ChatRequest, ChatResponse, TokenUsage};
use reqwest::Client;

/// Provider identity metadata
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub name: &'static str,
    pub default_base_url: &'static str,
}

/// Predefined provider identities for OpenAI-compatible APIs
pub mod identities {
    use super::ProviderIdentity;

    pub const OPENAI: ProviderIdentity = ProviderIdentity {
        name: "openai",
        default_base_url: "https://api.openai.com/v1",
    };

    pub const DEEPSEEK: ProviderIdentity = ProviderIdentity {
        name: "deepseek",
        default_base_url: "https://api.deepseek.com/v1",
    };
}

/// Generic OpenAI-compatible provider implementation
#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
    identity: ProviderIdentity,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider with custom identity
    pub fn new(
        mut config: OpenAICompatibleConfig,
        identity: ProviderIdentity,
    ) -> Result<Self, LlmError> {
        if config.base_url.is_none() {
            config.base_url = Some(identity.default_base_url.to_string());
        }
        config.validate()?;
        let client = super::http_client(config.timeout())?;
        Ok(Self {
            config,
            client,
            identity,
        })
    }

    /// Create an OpenAI provider
    pub fn openai(config: OpenAICompatibleConfig) -> Result<Self, LlmError> {
        Self::new(config, identities::OPENAI)
    }

    /// Create a DeepSeek provider
    pub fn deepseek(config: OpenAICompatibleConfig) -> Result<Self, LlmError> {
        Self::new(config, identities::DEEPSEEK)
    }

    /// Convert our ChatRequest to the chat/completions body
    fn to_openai_request(&self, request: &ChatRequest, model: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": model,
            "messages": request.messages.iter().map(|msg| serde_json::json!({
                "role": msg.role,
                "content": msg.content
            })).collect::<Vec<_>>()
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Parse the chat/completions response into our ChatResponse
    fn parse_openai_response(&self, response: &serde_json::Value) -> Result<ChatResponse, LlmError> {
        let choices = response["choices"].as_array().ok_or_else(|| {
            LlmError::serialization(
                format!("Missing 'choices' in {} response", self.identity.name),
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid response format",
                )),
            )
        })?;

        // A choice without content (e.g. filtered output) reads as empty text
        let text = choices
            .first()
            .and_then(|choice| choice["message"]["content"].as_str())
            .unwrap_or_default()
            .to_string();

        let usage = &response["usage"];
        let usage = TokenUsage {
            input_tokens: usage["prompt_tokens"].as_u64().map(|n| n as u32),
            output_tokens: usage["completion_tokens"].as_u64().map(|n| n as u32),
        };

        Ok(ChatResponse { text, usage })
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAICompatibleProvider {
    fn name(&self) -> &'static str {
        self.identity.name
    }

    async fn chat_completion(
        &self,
        request: ChatRequest,
        model: &str,
    ) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url());
        let body = self.to_openai_request(&request, model);

        let req = super::with_headers(self.client.post(&url), &self.config.headers());
        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| super::transport_error(e, self.config.timeout()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(super::status_error(self.identity.name, status, &error_text));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    LlmError::serialization("Failed to parse JSON response", e)
                } else {
                    super::transport_error(e, self.config.timeout())
                }
            })?;

        self.parse_openai_response(&response_json)
    }
}
