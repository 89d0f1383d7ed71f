//! HTTP surface: `/health`, `/generate` and `/followup` (plus `/v1/*` aliases).

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use easygpt_core::journal::generate_user_id;
use easygpt_core::normalizer::{parse_cards_from_text, parse_followup_from_text};
use easygpt_core::prompts::{build_cards_system_prompt, build_followup_system_prompt};
use easygpt_core::{
    Card, ChatRequestBuilder, Completion, InteractionJournal, LlmError, ProviderKind,
    ProviderRouter, RequestType, UsageInfo, UserInput,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::constants::{
    DEFAULT_FOLLOWUP_MAX_TOKENS, DEFAULT_GENERATE_MAX_TOKENS, DEFAULT_TEMPERATURE, MAX_TEMPERATURE,
};
use crate::error::ApiError;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub router: ProviderRouter,
    pub journal: InteractionJournal,
}

impl AppState {
    pub fn new(router: ProviderRouter, journal: InteractionJournal) -> Self {
        Self { router, journal }
    }
}

// ============================================================================
// REQUEST / RESPONSE BODIES
// ============================================================================

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_generate_max_tokens() -> u32 {
    DEFAULT_GENERATE_MAX_TOKENS
}

fn default_followup_max_tokens() -> u32 {
    DEFAULT_FOLLOWUP_MAX_TOKENS
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_generate_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct FollowupRequest {
    pub current_card_title: String,
    pub current_card_content: String,
    pub question: String,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_followup_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub cards: Vec<Card>,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: Value,
}

#[derive(Debug, Serialize)]
pub struct FollowupResponse {
    pub card: Card,
    pub usage: UsageInfo,
    pub raw_text: String,
}

fn check_sampling(temperature: f64, max_tokens: u32) -> Result<(), ApiError> {
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(ApiError::validation(format!(
            "temperature must be between 0 and {MAX_TEMPERATURE}, got {temperature}"
        )));
    }
    if max_tokens == 0 {
        return Err(ApiError::validation("max_tokens must be at least 1"));
    }
    Ok(())
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Journal the request, call the routed provider and journal the outcome.
async fn dispatch(
    state: &AppState,
    request_type: RequestType,
    input: &UserInput<'_>,
) -> Result<Completion, LlmError> {
    let user_id = generate_user_id();
    state
        .journal
        .log_user_request(&user_id, request_type, input)
        .await;

    let request = ChatRequestBuilder::new()
        .system(input.system_prompt)
        .user(input.prompt)
        .temperature(input.temperature)
        .max_tokens(input.max_tokens)
        .build();

    match state.router.generate(request, input.provider, input.model).await {
        Ok(completion) => {
            state
                .journal
                .log_model_response(&user_id, request_type, &completion.text, &completion.usage)
                .await;
            Ok(completion)
        }
        Err(e) => {
            state
                .journal
                .log_error(&user_id, request_type, &e.to_string())
                .await;
            Err(e)
        }
    }
}

/// POST /generate - answer a prompt with a list of cards
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(req) = payload?;
    check_sampling(req.temperature, req.max_tokens)?;

    let system_prompt = build_cards_system_prompt(req.system.as_deref());
    let input = UserInput {
        prompt: &req.prompt,
        system_prompt: &system_prompt,
        provider: req.provider.as_ref().map(ProviderKind::as_str),
        model: req.model.as_deref(),
        temperature: req.temperature,
        max_tokens: req.max_tokens,
    };

    let completion = dispatch(&state, RequestType::Generate, &input)
        .await
        .map_err(|e| {
            warn!("Generation failed: {e}");
            ApiError::generation(e)
        })?;

    let parsed = parse_cards_from_text(&completion.text);
    info!(
        "Generated {} card(s) via {}/{} in {}ms ({:?})",
        parsed.cards.len(),
        completion.usage.provider,
        completion.usage.model,
        completion.usage.latency_ms,
        parsed.source
    );

    let meta = parsed.meta();
    Ok(Json(GenerateResponse {
        cards: parsed.cards,
        usage: completion.usage,
        raw_text: completion.text,
        meta,
    }))
}

/// POST /followup - answer a clarifying question about one card
pub async fn followup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FollowupRequest>, JsonRejection>,
) -> Result<Json<FollowupResponse>, ApiError> {
    let Json(req) = payload?;
    check_sampling(req.temperature, req.max_tokens)?;

    let system_prompt =
        build_followup_system_prompt(&req.current_card_title, &req.current_card_content, None);
    let input = UserInput {
        prompt: &req.question,
        system_prompt: &system_prompt,
        provider: req.provider.as_ref().map(ProviderKind::as_str),
        model: req.model.as_deref(),
        temperature: req.temperature,
        max_tokens: req.max_tokens,
    };

    let completion = dispatch(&state, RequestType::Followup, &input)
        .await
        .map_err(|e| {
            warn!("Follow-up failed: {e}");
            ApiError::followup(e)
        })?;

    let card = parse_followup_from_text(&completion.text);
    info!(
        "Answered follow-up on '{}' via {}/{} in {}ms",
        req.current_card_title,
        completion.usage.provider,
        completion.usage.model,
        completion.usage.latency_ms
    );

    Ok(Json(FollowupResponse {
        card,
        usage: completion.usage,
        raw_text: completion.text,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// CORS for the given origins; a `*` entry opens it to any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn app(state: Arc<AppState>, origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/followup", post(followup))
        .route("/v1/generate", post(generate))
        .route("/v1/followup", post(followup))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use easygpt_core::{LoggingConfig, ModelsConfig};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(journal: InteractionJournal) -> Router {
        // OpenAI is configured but has no key, so it always fails
        let models = ModelsConfig::new("mock", [("openai", vec!["gpt-4o-mini".to_string()])]);
        let state = Arc::new(AppState::new(ProviderRouter::new(models), journal));
        app(state, &["*".to_string()])
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = test_app(InteractionJournal::disabled())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn generate_with_mock_returns_cards_usage_and_meta() {
        let (status, body) = post_json(
            test_app(InteractionJournal::disabled()),
            "/generate",
            json!({ "prompt": "Explain ownership", "provider": "mock" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let cards = body["cards"].as_array().unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0]["id"], "overview");
        assert_eq!(cards[0]["kind"], "text");
        assert_eq!(body["usage"]["provider"], "mock");
        assert_eq!(body["usage"]["model"], "mock-model");
        assert_eq!(body["usage"]["input_tokens"], 0);
        assert_eq!(body["meta"], json!({ "source": "json", "card_count": 2 }));
        assert!(body["raw_text"].as_str().unwrap().contains("\"cards\""));
    }

    #[tokio::test]
    async fn versioned_alias_serves_the_same_handler() {
        let (status, body) = post_json(
            test_app(InteractionJournal::disabled()),
            "/v1/generate",
            json!({ "prompt": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usage"]["provider"], "mock");
    }

    #[tokio::test]
    async fn missing_key_is_a_generation_error() {
        let (status, body) = post_json(
            test_app(InteractionJournal::disabled()),
            "/generate",
            json!({ "prompt": "hi", "provider": "openai" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "generation_error");
        assert_eq!(
            body["message"],
            "OPENAI_API_KEY is not set. Please add it to your environment or switch provider to 'mock'."
        );
    }

    #[tokio::test]
    async fn followup_returns_a_single_card() {
        let (status, body) = post_json(
            test_app(InteractionJournal::disabled()),
            "/followup",
            json!({
                "current_card_title": "Step 1",
                "current_card_content": "Install rustup.",
                "question": "Which toolchain?",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["card"]["id"].is_string());
        assert!(body["card"]["content"].is_string());
        assert_eq!(body["usage"]["provider"], "mock");
    }

    #[tokio::test]
    async fn followup_failure_uses_its_own_error_type() {
        let (status, body) = post_json(
            test_app(InteractionJournal::disabled()),
            "/v1/followup",
            json!({
                "current_card_title": "Step 1",
                "current_card_content": "Install rustup.",
                "question": "Which toolchain?",
                "provider": "openai",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "followup_error");
    }

    #[tokio::test]
    async fn out_of_range_parameters_are_rejected() {
        for payload in [
            json!({ "prompt": "hi", "temperature": 2.5 }),
            json!({ "prompt": "hi", "temperature": -0.1 }),
            json!({ "prompt": "hi", "max_tokens": 0 }),
            json!({ "prompt": "hi", "provider": "anthropic" }),
            json!({ "system": "missing prompt" }),
        ] {
            let (status, body) =
                post_json(test_app(InteractionJournal::disabled()), "/generate", payload).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["error_type"], "validation_error");
            assert!(body["message"].is_string());
        }
    }

    #[tokio::test]
    async fn journal_records_request_and_outcome() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = InteractionJournal::new(&LoggingConfig {
            enabled: true,
            path: path.clone(),
        });
        let app = test_app(journal);

        post_json(app.clone(), "/generate", json!({ "prompt": "ok" })).await;
        post_json(
            app,
            "/generate",
            json!({ "prompt": "fails", "provider": "openai" }),
        )
        .await;

        let entries: Vec<Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let events: Vec<_> = entries.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(events, vec!["request", "response", "request", "error"]);
        assert_eq!(entries[0]["user_id"], entries[1]["user_id"]);
        assert_ne!(entries[0]["user_id"], entries[2]["user_id"]);
        assert_eq!(entries[2]["user_input"]["provider"], "openai");
        assert_eq!(entries[0]["user_input"]["max_tokens"], 800);
        assert_eq!(entries[0]["user_input"]["temperature"], 0.2);
    }

    #[tokio::test]
    async fn cors_echoes_a_listed_origin() {
        let models = ModelsConfig::default();
        let state = Arc::new(AppState::new(
            ProviderRouter::new(models),
            InteractionJournal::disabled(),
        ));
        let app = app(state, &["http://localhost:8501".to_string()]);

        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://localhost:8501")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:8501"
        );
    }
}
