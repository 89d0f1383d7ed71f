use crate::config::{
    GoogleAiConfig, MOCK_MODEL, MOCK_PROVIDER, ModelsConfig, OpenAICompatibleConfig, Settings,
};
use crate::error::LlmError;
use crate::providers::{GoogleProvider, MockProvider, OpenAICompatibleProvider, ProviderKind};
use crate::types::{ChatProvider, ChatRequest, Completion, UsageInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Provider and model a request will actually be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResolution {
    pub provider: String,
    pub model: String,
}

/// Resolve the requested provider/model against the configured mapping.
///
/// Absent or empty inputs use the defaults; an unknown provider or one with no
/// models degrades to the mock pair. A requested model is taken verbatim.
pub fn resolve(
    models: &ModelsConfig,
    requested_provider: Option<&str>,
    requested_model: Option<&str>,
) -> ProviderResolution {
    let mut provider = requested_provider
        .filter(|p| !p.is_empty())
        .unwrap_or(models.default_provider())
        .to_lowercase();

    let provider_models = match models.models_for(&provider) {
        Some(list) if !list.is_empty() => list,
        _ => {
            provider = MOCK_PROVIDER.to_string();
            models.models_for(MOCK_PROVIDER).unwrap_or_default()
        }
    };

    let model = match requested_model.filter(|m| !m.is_empty()) {
        Some(model) => model.to_string(),
        None => provider_models
            .first()
            .cloned()
            .unwrap_or_else(|| MOCK_MODEL.to_string()),
    };

    ProviderResolution { provider, model }
}

/// Dispatch table from provider kind to client, plus the model mapping used to
/// resolve each request.
pub struct ProviderRouter {
    models: ModelsConfig,
    clients: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderRouter {
    /// Router that only knows the mock client.
    pub fn new(models: ModelsConfig) -> Self {
        let mut clients: HashMap<ProviderKind, Arc<dyn ChatProvider>> = HashMap::new();
        clients.insert(ProviderKind::Mock, Arc::new(MockProvider::new()));
        Self { models, clients }
    }

    /// Build clients for every provider whose API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        let mut router = Self::new(settings.models.clone());
        let timeout = settings.request_timeout.as_secs();
        let credentials = &settings.credentials;

        for kind in ProviderKind::remote() {
            let Some(api_key) = credentials.api_key(kind) else {
                log::debug!("No API key for {kind}, provider disabled");
                continue;
            };
            let base_url = credentials.base_url(kind);

            let client: Arc<dyn ChatProvider> = match kind {
                ProviderKind::OpenAI | ProviderKind::DeepSeek => {
                    let mut config = OpenAICompatibleConfig::new(api_key).with_timeout(timeout);
                    if let Some(url) = base_url {
                        config = config.with_base_url(url);
                    }
                    if kind == ProviderKind::OpenAI {
                        Arc::new(OpenAICompatibleProvider::openai(config)?)
                    } else {
                        Arc::new(OpenAICompatibleProvider::deepseek(config)?)
                    }
                }
                ProviderKind::Gemini => {
                    let mut config = GoogleAiConfig::new(api_key).with_timeout(timeout);
                    if let Some(url) = base_url {
                        config = config.with_base_url(url);
                    }
                    Arc::new(GoogleProvider::new(config)?)
                }
                ProviderKind::Mock => continue,
            };
            router.clients.insert(kind, client);
        }

        Ok(router)
    }

    /// Register or replace the client serving `kind`.
    pub fn with_client(mut self, kind: ProviderKind, client: Arc<dyn ChatProvider>) -> Self {
        self.clients.insert(kind, client);
        self
    }

    pub fn resolve(
        &self,
        requested_provider: Option<&str>,
        requested_model: Option<&str>,
    ) -> ProviderResolution {
        resolve(&self.models, requested_provider, requested_model)
    }

    fn client_for(&self, kind: ProviderKind) -> Result<&Arc<dyn ChatProvider>, LlmError> {
        self.clients.get(&kind).ok_or_else(|| match kind.env_key() {
            Some(env_key) => LlmError::missing_api_key(env_key),
            None => LlmError::configuration(format!("No client registered for {kind}")),
        })
    }

    /// Resolve the provider, call it and wrap the answer with usage metadata.
    ///
    /// Latency is wall-clock time around the provider call only.
    pub async fn generate(
        &self,
        request: ChatRequest,
        requested_provider: Option<&str>,
        requested_model: Option<&str>,
    ) -> Result<Completion, LlmError> {
        let resolution = self.resolve(requested_provider, requested_model);
        let kind = ProviderKind::from_name(&resolution.provider).unwrap_or_else(|| {
            log::warn!(
                "Provider '{}' has no client implementation, answering with mock",
                resolution.provider
            );
            ProviderKind::Mock
        });
        let client = self.client_for(kind)?;

        let start = Instant::now();
        let result = client.chat_completion(request, &resolution.model).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                log::debug!(
                    "{}/{} answered in {}ms ({} chars)",
                    resolution.provider,
                    resolution.model,
                    latency_ms,
                    response.text.len()
                );
                Ok(Completion {
                    text: response.text,
                    usage: UsageInfo {
                        provider: resolution.provider,
                        model: resolution.model,
                        input_tokens: response.usage.input_tokens,
                        output_tokens: response.usage.output_tokens,
                        latency_ms,
                    },
                })
            }
            Err(error) => {
                log::error!(
                    "{}/{} failed after {}ms: {}",
                    resolution.provider,
                    resolution.model,
                    latency_ms,
                    error
                );
                Err(error)
            }
        }
    }
}
