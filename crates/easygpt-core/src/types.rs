use crate::error::LlmError;
use serde::{Deserialize, Serialize};

/// Represents a message sent to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Role of the message sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Request parameters for a single completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Content of the first system message, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }
}

/// Response from a provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Token counts as reported by the provider. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// The single capability every provider client implements: turn prompts into text.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Canonical provider identifier (e.g. "openai", "gemini").
    fn name(&self) -> &'static str;

    /// Send a completion request for `model`.
    async fn chat_completion(
        &self,
        request: ChatRequest,
        model: &str,
    ) -> Result<ChatResponse, LlmError>;
}

/// Builder pattern for chat requests
#[derive(Default)]
pub struct ChatRequestBuilder {
    messages: Vec<ChatMessage>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl ChatRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(mut self, role: ChatRole, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
        self
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.add_message(ChatRole::System, content)
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.add_message(ChatRole::User, content)
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn build(self) -> ChatRequest {
        ChatRequest {
            messages: self.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Single UI card unit rendered by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default = "Card::default_kind")]
    pub kind: String,
}

impl Card {
    pub const DEFAULT_KIND: &'static str = "text";

    fn default_kind() -> String {
        Self::DEFAULT_KIND.to_string()
    }
}

/// Token and latency metadata describing one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub provider: String,
    pub model: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub latency_ms: u64,
}

/// Raw provider text together with the usage of the call that produced it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: UsageInfo,
}
