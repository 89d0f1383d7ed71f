use crate::error::LlmError;
use crate::types::{ChatProvider, ChatRequest, ChatResponse, TokenUsage};

/// Offline provider that always answers with the same two-card document.
///
/// Used when no provider is configured and as the fallback target of routing,
/// so the server stays usable without any API key.
#[derive(Clone, Debug, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    fn canned_cards() -> serde_json::Value {
        serde_json::json!({
            "cards": [
                {
                    "id": "overview",
                    "title": "Overview",
                    "content": "This is a mock response demonstrating the card layout.",
                    "kind": "text"
                },
                {
                    "id": "step-1",
                    "title": "Step 1",
                    "content": "Explain step one clearly and concisely.",
                    "kind": "text"
                }
            ]
        })
    }
}

#[async_trait::async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat_completion(
        &self,
        _request: ChatRequest,
        _model: &str,
    ) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            text: Self::canned_cards().to_string(),
            usage: TokenUsage {
                input_tokens: Some(0),
                output_tokens: Some(0),
            },
        })
    }
}
