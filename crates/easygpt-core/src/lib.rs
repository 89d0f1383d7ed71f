//! # easygpt-core
//!
//! Routing and response normalization behind the EasyGPT card backend.
//!
//! A request names an optional provider and model; the [`ProviderRouter`]
//! resolves them against the configured provider → model mapping (falling
//! back to the built-in mock), calls the provider and reports usage. The raw
//! text is then handed to the [`normalizer`], which recovers a list of
//! [`Card`]s even when the model wraps its JSON in prose or code fences.
//!
//! ```rust,no_run
//! use easygpt_core::{ChatRequestBuilder, ProviderRouter, Settings, prompts};
//! use easygpt_core::normalizer::parse_cards_from_text;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(std::path::Path::new("easygpt.toml"))?;
//!     let router = ProviderRouter::from_settings(&settings)?;
//!
//!     let request = ChatRequestBuilder::new()
//!         .system(prompts::build_cards_system_prompt(None))
//!         .user("How do I start learning Rust?")
//!         .temperature(0.2)
//!         .max_tokens(800)
//!         .build();
//!
//!     let completion = router.generate(request, None, None).await?;
//!     let parsed = parse_cards_from_text(&completion.text);
//!     for card in parsed.cards {
//!         println!("{}: {}", card.title, card.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod journal;
pub mod normalizer;
pub mod prompts;
pub mod providers;
pub mod router;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{
    ApiCredentials, GoogleAiConfig, LoggingConfig, ModelsConfig, OpenAICompatibleConfig,
    ProviderConfig, Settings,
};
pub use error::LlmError;
pub use journal::{InteractionJournal, RequestType, UserInput};
pub use normalizer::{ExtractionSource, ParsedCards};
pub use providers::{GoogleProvider, MockProvider, OpenAICompatibleProvider, ProviderKind};
pub use router::{ProviderResolution, ProviderRouter};
pub use types::{
    Card, ChatMessage, ChatProvider, ChatRequest, ChatRequestBuilder, ChatResponse, ChatRole,
    Completion, TokenUsage, UsageInfo,
};
