use crate::error::LlmError;
use crate::providers::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timeout applied to every provider HTTP request unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider that is always present in a normalized [`ModelsConfig`].
pub const MOCK_PROVIDER: &str = "mock";
pub const MOCK_MODEL: &str = "mock-model";

pub const DEFAULT_LOG_PATH: &str = "logs/easygpt.jsonl";

/// Configuration trait for HTTP-based LLM providers
pub trait ProviderConfig: Send + Sync {
    /// Get the API key for this provider
    fn api_key(&self) -> &str;

    /// Get the base URL for API requests
    fn base_url(&self) -> &str;

    /// Get default request timeout
    fn timeout(&self) -> Duration;

    /// Get any additional headers required by the provider
    fn headers(&self) -> HashMap<String, String>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), LlmError>;
}

/// OpenAI-compatible configuration (OpenAI itself and DeepSeek)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
}

impl OpenAICompatibleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }

    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new(api_key).with_base_url("https://api.deepseek.com/v1")
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

impl ProviderConfig for OpenAICompatibleConfig {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    fn validate(&self) -> Result<(), LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::configuration("API key is required"));
        }
        validate_base_url(self.base_url())
    }
}

/// Google AI (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAiConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
}

impl GoogleAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

impl ProviderConfig for GoogleAiConfig {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    fn validate(&self) -> Result<(), LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::configuration("Gemini API key is required"));
        }
        validate_base_url(self.base_url())
    }
}

fn validate_base_url(base_url: &str) -> Result<(), LlmError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(LlmError::configuration(
            "Base URL must be a valid HTTP/HTTPS URL",
        ));
    }
    Ok(())
}

/// Journal settings from the `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

/// Models listed for a provider in the config file. A string is one model, an
/// array lists several (items are stringified); anything else lists none.
fn model_names(value: toml::Value) -> Vec<String> {
    match value {
        toml::Value::String(model) => vec![model],
        toml::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(model) => model,
                other => other.to_string(),
            })
            .collect(),
        other => {
            log::warn!("Ignoring model entry {other}; expected a string or a list");
            Vec::new()
        }
    }
}

/// Provider to model-list mapping plus the default provider.
///
/// Always normalized: keys are lower-case, a non-empty `mock` entry exists and
/// `default_provider` names a key of the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsConfig {
    default_provider: String,
    providers: BTreeMap<String, Vec<String>>,
}

impl ModelsConfig {
    pub fn new<I, K, V>(default_provider: impl Into<String>, providers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<String>>,
    {
        let mut normalized: BTreeMap<String, Vec<String>> = providers
            .into_iter()
            .map(|(key, models)| (key.into().to_lowercase(), models.into()))
            .collect();

        let has_mock_model = normalized
            .get(MOCK_PROVIDER)
            .is_some_and(|models| !models.is_empty());
        if !has_mock_model {
            normalized.insert(MOCK_PROVIDER.to_string(), vec![MOCK_MODEL.to_string()]);
        }

        let mut default_provider = default_provider.into().to_lowercase();
        if !normalized.contains_key(&default_provider) {
            default_provider = MOCK_PROVIDER.to_string();
        }

        Self {
            default_provider,
            providers: normalized,
        }
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Models configured for `provider` (case-insensitive).
    pub fn models_for(&self, provider: &str) -> Option<&[String]> {
        self.providers
            .get(&provider.to_lowercase())
            .map(Vec::as_slice)
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self::new(MOCK_PROVIDER, Vec::<(String, Vec<String>)>::new())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelsSection {
    default_provider: Option<String>,
    providers: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HttpSection {
    timeout_seconds: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    logging: LoggingConfig,
    models: ModelsSection,
    http: HttpSection,
}

/// API credentials and endpoint overrides taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub base_urls: HashMap<ProviderKind, String>,
}

impl ApiCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut credentials = Self::default();
        for kind in ProviderKind::remote() {
            let Some(env_key) = kind.env_key() else {
                continue;
            };
            let key = read(env_key);
            match kind {
                ProviderKind::OpenAI => credentials.openai_api_key = key,
                ProviderKind::Gemini => credentials.gemini_api_key = key,
                ProviderKind::DeepSeek => credentials.deepseek_api_key = key,
                ProviderKind::Mock => {}
            }
            if let Some(url) = kind.base_url_env_key().and_then(read) {
                credentials.base_urls.insert(kind, url);
            }
        }
        credentials
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAI => self.openai_api_key.as_deref(),
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::DeepSeek => self.deepseek_api_key.as_deref(),
            ProviderKind::Mock => None,
        }
    }

    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        self.base_urls.get(&kind).map(String::as_str)
    }
}

/// Process-wide configuration, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub models: ModelsConfig,
    pub credentials: ApiCredentials,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            models: ModelsConfig::default(),
            credentials: ApiCredentials::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Settings {
    /// Load the TOML file at `path` (defaults if it does not exist) and read
    /// credentials from the environment.
    pub fn load(path: &Path) -> Result<Self, LlmError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|e| {
                LlmError::configuration(format!(
                    "Failed to read config file {}: {e}",
                    path.display()
                ))
            })?
        } else {
            log::info!("Config file {} not found, using defaults", path.display());
            String::new()
        };

        let mut settings = Self::from_toml_str(&content)?;
        settings.credentials = ApiCredentials::from_env();
        Ok(settings)
    }

    /// Parse settings from TOML text. Credentials are left empty.
    pub fn from_toml_str(content: &str) -> Result<Self, LlmError> {
        let file: FileConfig = if content.trim().is_empty() {
            FileConfig::default()
        } else {
            toml::from_str(content).map_err(|e| {
                LlmError::configuration(format!("Failed to parse config file: {e}"))
            })?
        };

        let models = ModelsConfig::new(
            file.models
                .default_provider
                .unwrap_or_else(|| MOCK_PROVIDER.to_string()),
            file.models
                .providers
                .into_iter()
                .map(|(provider, models)| (provider, model_names(models))),
        );

        Ok(Self {
            logging: file.logging,
            models,
            credentials: ApiCredentials::default(),
            request_timeout: Duration::from_secs(file.http.timeout_seconds),
        })
    }

    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_models(mut self, models: ModelsConfig) -> Self {
        self.models = models;
        self
    }
}
