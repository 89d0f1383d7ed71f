//! Append-only JSON-lines record of user requests, model outputs and errors.
//!
//! Journal writes are best effort: a failure is reported through `log` and
//! dropped, it never reaches the request that triggered it.

use crate::config::LoggingConfig;
use crate::types::UsageInfo;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Endpoint a journal entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Generate,
    Followup,
}

/// What the user asked for, as recorded in a `request` event.
#[derive(Debug, Clone, Serialize)]
pub struct UserInput<'a> {
    pub prompt: &'a str,
    pub system_prompt: &'a str,
    pub provider: Option<&'a str>,
    pub model: Option<&'a str>,
    pub temperature: f64,
    pub max_tokens: u32,
}

pub struct InteractionJournal {
    enabled: bool,
    sink: Arc<JournalFile>,
}

struct JournalFile {
    path: PathBuf,
    // Held for the whole open+write so concurrent entries never interleave
    write_lock: Mutex<()>,
}

impl JournalFile {
    fn append(&self, line: &str) {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            log::warn!("Dropping journal entry for {}: {e}", self.path.display());
        }
    }
}

impl InteractionJournal {
    pub fn new(config: &LoggingConfig) -> Self {
        if config.enabled {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::warn!(
                        "Could not create journal directory {}: {e}",
                        parent.display()
                    );
                }
            }
            log::info!("Journaling interactions to {}", config.path.display());
        }

        Self {
            enabled: config.enabled,
            sink: Arc::new(JournalFile {
                path: config.path.clone(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// A journal that records nothing.
    pub fn disabled() -> Self {
        Self::new(&LoggingConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.sink.path
    }

    pub async fn log_user_request(
        &self,
        user_id: &str,
        request_type: RequestType,
        input: &UserInput<'_>,
    ) {
        self.write_entry(
            user_id,
            request_type,
            "request",
            ("user_input", json!(input)),
        )
        .await;
    }

    pub async fn log_model_response(
        &self,
        user_id: &str,
        request_type: RequestType,
        model_output: &str,
        usage: &UsageInfo,
    ) {
        self.write_entry(
            user_id,
            request_type,
            "response",
            (
                "model_output",
                json!({
                    "text": model_output,
                    "provider": usage.provider,
                    "model": usage.model,
                    "input_tokens": usage.input_tokens,
                    "output_tokens": usage.output_tokens,
                    "latency_ms": usage.latency_ms,
                }),
            ),
        )
        .await;
    }

    pub async fn log_error(&self, user_id: &str, request_type: RequestType, error_message: &str) {
        self.write_entry(
            user_id,
            request_type,
            "error",
            ("error", json!({ "message": error_message })),
        )
        .await;
    }

    /// Serialize one event and append it on the blocking pool, so a slow disk
    /// never stalls the async workers.
    async fn write_entry(
        &self,
        user_id: &str,
        request_type: RequestType,
        event: &str,
        (payload_key, payload): (&str, Value),
    ) {
        if !self.enabled {
            return;
        }

        let mut entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "user_id": user_id,
            "request_type": request_type,
            "event": event,
        });
        entry[payload_key] = payload;

        let mut line = entry.to_string();
        line.push('\n');

        let sink = Arc::clone(&self.sink);
        if let Err(e) = tokio::task::spawn_blocking(move || sink.append(&line)).await {
            log::warn!("Journal writer task failed: {e}");
        }
    }
}

/// Fresh identifier tying together the entries of one request.
pub fn generate_user_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
