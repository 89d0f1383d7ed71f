use crate::config::{ApiCredentials, ModelsConfig, Settings};
use crate::error::LlmError;
use crate::normalizer::{ExtractionSource, parse_cards_from_text, parse_followup_from_text};
use crate::providers::ProviderKind;
use crate::router::ProviderRouter;
use crate::types::{ChatProvider, ChatRequest, ChatRequestBuilder, ChatResponse, TokenUsage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Scripted provider for testing
struct ScriptedProvider {
    name: &'static str,
    reply: Result<String, String>,
    delay: Duration,
    seen: Mutex<Vec<(ChatRequest, String)>>,
}

impl ScriptedProvider {
    fn replying(name: &'static str, text: &str) -> Self {
        Self {
            name,
            reply: Ok(text.to_string()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(name: &'static str, message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying(name, "")
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn chat_completion(
        &self,
        request: ChatRequest,
        model: &str,
    ) -> Result<ChatResponse, LlmError> {
        self.seen
            .lock()
            .unwrap()
            .push((request, model.to_string()));
        tokio::time::sleep(self.delay).await;

        match &self.reply {
            Ok(text) => Ok(ChatResponse {
                text: text.clone(),
                usage: TokenUsage {
                    input_tokens: Some(11),
                    output_tokens: None,
                },
            }),
            Err(message) => Err(LlmError::api(self.name, message.clone(), Some("502".into()))),
        }
    }
}

fn models() -> ModelsConfig {
    ModelsConfig::new(
        "openai",
        [
            ("openai", vec!["gpt-4o-mini".to_string()]),
            ("gemini", vec!["gemini-1.5-flash".to_string()]),
            ("deepseek", vec!["deepseek-chat".to_string()]),
            ("anthropic", vec!["claude-3-haiku".to_string()]),
        ],
    )
}

fn request() -> ChatRequest {
    ChatRequestBuilder::new()
        .system("respond with cards")
        .user("teach me traits")
        .temperature(0.2)
        .max_tokens(800)
        .build()
}

#[tokio::test]
async fn router_passes_prompts_and_model_to_the_resolved_client() {
    let openai = Arc::new(ScriptedProvider::replying(
        "openai",
        r#"{"cards":[{"title":"Traits","content":"Shared behaviour."}]}"#,
    ));
    let router = ProviderRouter::new(models()).with_client(ProviderKind::OpenAI, openai.clone());

    let completion = router.generate(request(), None, Some("gpt-custom")).await.unwrap();

    assert_eq!(completion.usage.provider, "openai");
    assert_eq!(completion.usage.model, "gpt-custom");
    assert_eq!(completion.usage.input_tokens, Some(11));
    assert_eq!(completion.usage.output_tokens, None);

    let seen = openai.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (sent, model) = &seen[0];
    assert_eq!(model, "gpt-custom");
    assert_eq!(sent.system_prompt(), Some("respond with cards"));
    assert_eq!(sent.temperature, Some(0.2));
    assert_eq!(sent.max_tokens, Some(800));

    let parsed = parse_cards_from_text(&completion.text);
    assert_eq!(parsed.source, ExtractionSource::Json);
    assert_eq!(parsed.cards[0].title, "Traits");
}

#[tokio::test]
async fn latency_covers_the_provider_call() {
    let slow = ScriptedProvider::replying("gemini", "plain text").with_delay(Duration::from_millis(30));
    let router = ProviderRouter::new(models()).with_client(ProviderKind::Gemini, Arc::new(slow));

    let completion = router.generate(request(), Some("gemini"), None).await.unwrap();
    assert!(completion.usage.latency_ms >= 30);
    assert_eq!(completion.usage.model, "gemini-1.5-flash");
}

#[tokio::test]
async fn missing_credentials_surface_as_configuration_error() {
    let router = ProviderRouter::from_settings(&Settings::default().with_models(models())).unwrap();

    let err = router
        .generate(request(), Some("deepseek"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Configuration { .. }));
    assert_eq!(
        err.to_string(),
        "DEEPSEEK_API_KEY is not set. Please add it to your environment or switch provider to 'mock'."
    );
}

#[tokio::test]
async fn provider_errors_propagate_without_retry() {
    let failing = Arc::new(ScriptedProvider::failing("openai", "upstream unavailable"));
    let router = ProviderRouter::new(models()).with_client(ProviderKind::OpenAI, failing.clone());

    let err = router.generate(request(), Some("openai"), None).await.unwrap_err();
    assert!(err.to_string().contains("upstream unavailable"));
    assert_eq!(failing.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_provider_is_served_by_mock() {
    let router = ProviderRouter::new(models());

    let completion = router
        .generate(request(), Some("does-not-exist"), None)
        .await
        .unwrap();
    assert_eq!(completion.usage.provider, "mock");
    assert_eq!(completion.usage.model, "mock-model");
    assert_eq!(completion.usage.input_tokens, Some(0));

    let parsed = parse_cards_from_text(&completion.text);
    let ids: Vec<_> = parsed.cards.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["overview", "step-1"]);
}

#[tokio::test]
async fn configured_provider_without_client_kind_reports_its_name() {
    let router = ProviderRouter::new(models());

    let completion = router
        .generate(request(), Some("anthropic"), None)
        .await
        .unwrap();
    assert_eq!(completion.usage.provider, "anthropic");
    assert_eq!(completion.usage.model, "claude-3-haiku");
}

#[tokio::test]
async fn settings_with_keys_register_remote_clients() {
    let credentials = ApiCredentials::from_lookup(|key| match key {
        "OPENAI_API_KEY" | "GEMINI_API_KEY" => Some("test-key".to_string()),
        _ => None,
    });
    let settings = Settings::default()
        .with_models(models())
        .with_credentials(credentials);
    let router = ProviderRouter::from_settings(&settings).unwrap();

    // DeepSeek is the only remote provider left without a client
    let err = router
        .generate(request(), Some("deepseek"), None)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("DEEPSEEK_API_KEY"));
}

#[test]
fn invalid_base_url_fails_router_construction() {
    let credentials = ApiCredentials::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("test-key".to_string()),
        "OPENAI_BASE_URL" => Some("localhost:1234".to_string()),
        _ => None,
    });
    let settings = Settings::default().with_credentials(credentials);
    assert!(matches!(
        ProviderRouter::from_settings(&settings),
        Err(LlmError::Configuration { .. })
    ));
}

#[tokio::test]
async fn followup_round_trip_through_router() {
    let reply = "Of course!\n```json\n{\"card\": {\"title\": \"Answer\", \"content\": \"Use &str.\"}}\n```";
    let router = ProviderRouter::new(models())
        .with_client(ProviderKind::OpenAI, Arc::new(ScriptedProvider::replying("openai", reply)));

    let completion = router.generate(request(), None, None).await.unwrap();
    let card = parse_followup_from_text(&completion.text);
    assert_eq!(card.title, "Answer");
    assert_eq!(card.content, "Use &str.");
}
