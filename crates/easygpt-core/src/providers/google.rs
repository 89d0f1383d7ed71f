use crate::config::{GoogleAiConfig, ProviderConfig};
use crate::error::LlmError;
use crate::types::{ChatProvider, ChatRequest, ChatResponse, ChatRole, TokenUsage};
use reqwest::Client;

/// Google AI (Gemini) provider implementation
pub struct GoogleProvider {
    config: GoogleAiConfig,
    client: Client,
}

impl GoogleProvider {
    /// Create a new Gemini provider instance
    pub fn new(config: GoogleAiConfig) -> Result<Self, LlmError> {
        config.validate()?;
        let client = super::http_client(config.timeout())?;
        Ok(Self { config, client })
    }

    /// Convert internal ChatRequest to the generateContent body
    fn to_google_ai_request(&self, request: &ChatRequest) -> serde_json::Value {
        let mut contents = Vec::new();
        let mut system_instruction = None;

        for message in &request.messages {
            match message.role {
                // Gemini takes system prompts out-of-band
                ChatRole::System => {
                    system_instruction = Some(serde_json::json!({
                        "parts": [{"text": message.content}]
                    }));
                }
                ChatRole::User => {
                    contents.push(serde_json::json!({
                        "role": "user",
                        "parts": [{"text": message.content}]
                    }));
                }
                ChatRole::Assistant => {
                    contents.push(serde_json::json!({
                        "role": "model",
                        "parts": [{"text": message.content}]
                    }));
                }
            }
        }

        let mut request_body = serde_json::json!({
            "contents": contents
        });

        if let Some(system_instr) = system_instruction {
            request_body["systemInstruction"] = system_instr;
        }

        let mut generation_config = serde_json::Map::new();

        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".to_string(), serde_json::json!(temperature));
        }

        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), serde_json::json!(max_tokens));
        }

        if !generation_config.is_empty() {
            request_body["generationConfig"] = serde_json::Value::Object(generation_config);
        }

        request_body
    }

    /// Parse a generateContent response into our ChatResponse
    fn parse_google_ai_response(&self, response: &serde_json::Value) -> ChatResponse {
        // Blocked prompts come back without candidates; that reads as empty text
        let text = response["candidates"]
            .as_array()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate["content"]["parts"].as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage_metadata = &response["usageMetadata"];
        let usage = TokenUsage {
            input_tokens: usage_metadata["promptTokenCount"]
                .as_u64()
                .map(|n| n as u32),
            output_tokens: usage_metadata["candidatesTokenCount"]
                .as_u64()
                .map(|n| n as u32),
        };

        ChatResponse { text, usage }
    }
}

#[async_trait::async_trait]
impl ChatProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn chat_completion(
        &self,
        request: ChatRequest,
        model: &str,
    ) -> Result<ChatResponse, LlmError> {
        let google_request = self.to_google_ai_request(&request);

        // Build the URL with API key as query parameter
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url(),
            model,
            self.config.api_key()
        );

        let req = super::with_headers(self.client.post(&url), &self.config.headers());
        let response = req
            .json(&google_request)
            .send()
            .await
            .map_err(|e| super::transport_error(e, self.config.timeout()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| super::transport_error(e, self.config.timeout()))?;

        if !status.is_success() {
            return Err(super::status_error(self.name(), status, &response_text));
        }

        let response_json: serde_json::Value =
            serde_json::from_str(&response_text).map_err(|e| {
                LlmError::serialization(format!("Failed to parse JSON response: {e}"), e)
            })?;

        Ok(self.parse_google_ai_response(&response_json))
    }
}
