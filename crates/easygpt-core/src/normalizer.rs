//! Recovery of structured cards from free-form model output.
//!
//! Models are asked to answer with a bare JSON document, but in practice they
//! wrap it in prose or a fenced code block, or ignore the instruction
//! entirely. Extraction runs in two stages (outermost braces, then a
//! ```` ```json ```` fence) and falls back to a single card holding the raw
//! text, so callers always get something displayable.

use crate::types::Card;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

pub const FALLBACK_TITLE: &str = "Response";
pub const FOLLOWUP_TITLE: &str = "Clarification";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("fenced block pattern is valid")
});

/// Which extraction stage produced the cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    /// The span from the first `{` to the last `}`.
    Json,
    /// The body of a ```` ```json ```` fenced block.
    Fenced,
    /// Nothing usable was found; the raw text became the card.
    Fallback,
}

/// Cards recovered from a generation response.
#[derive(Debug, Clone)]
pub struct ParsedCards {
    pub cards: Vec<Card>,
    pub source: ExtractionSource,
}

impl ParsedCards {
    /// Diagnostic metadata returned to the client next to the cards.
    pub fn meta(&self) -> Value {
        serde_json::json!({
            "source": self.source,
            "card_count": self.cards.len(),
        })
    }
}

/// Parse the multi-card answer to a generation prompt. Never fails and never
/// returns an empty list.
pub fn parse_cards_from_text(text: &str) -> ParsedCards {
    let extracted = extract(text, |document| {
        let items = document.get("cards")?.as_array()?;
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| coerce_card(item, || format!("Card {}", idx + 1)))
                .collect::<Vec<_>>(),
        )
    });

    let parsed = match extracted {
        Some((source, cards)) => ParsedCards { cards, source },
        None => ParsedCards {
            cards: vec![fallback_card(text, FALLBACK_TITLE)],
            source: ExtractionSource::Fallback,
        },
    };

    log::debug!(
        "Parsed {} card(s) from model output via {:?}",
        parsed.cards.len(),
        parsed.source
    );
    parsed
}

/// Parse the single-card answer to a follow-up question. Never fails.
pub fn parse_followup_from_text(text: &str) -> Card {
    let extracted = extract(text, |document| {
        let item = document.get("card")?;
        item.is_object()
            .then(|| coerce_card(item, || FOLLOWUP_TITLE.to_string()))
    });

    match extracted {
        Some((source, card)) => {
            log::debug!("Parsed follow-up card via {source:?}");
            card
        }
        None => {
            log::debug!("Follow-up output had no card, using raw text");
            fallback_card(text, FOLLOWUP_TITLE)
        }
    }
}

/// Run both extraction stages in order and return the first candidate that
/// `pick` accepts.
fn extract<T>(
    text: &str,
    pick: impl Fn(&Value) -> Option<T>,
) -> Option<(ExtractionSource, T)> {
    let stages = [
        (ExtractionSource::Json, outer_braces(text)),
        (ExtractionSource::Fenced, fenced_block(text)),
    ];

    stages.into_iter().find_map(|(source, candidate)| {
        let document: Value = serde_json::from_str(candidate?).ok()?;
        pick(&document).map(|found| (source, found))
    })
}

fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn fenced_block(text: &str) -> Option<&str> {
    FENCED_JSON
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|inner| inner.as_str())
}

fn coerce_card(item: &Value, default_title: impl FnOnce() -> String) -> Card {
    let (id, title, content, kind) = if item.is_object() {
        (
            field(item, "id"),
            field(item, "title"),
            field(item, "content"),
            field(item, "kind"),
        )
    } else {
        // A bare value in the list is treated as the body of an untitled card
        (None, None, as_text(item), None)
    };

    Card {
        id: id.unwrap_or_else(new_card_id),
        title: title.unwrap_or_else(default_title),
        content: content.unwrap_or_default(),
        kind: kind.unwrap_or_else(|| Card::DEFAULT_KIND.to_string()),
    }
}

fn field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(as_text)
}

/// String form of a JSON value; `null` and `""` count as absent.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn fallback_card(text: &str, title: &str) -> Card {
    Card {
        id: new_card_id(),
        title: title.to_string(),
        content: text.trim().to_string(),
        kind: Card::DEFAULT_KIND.to_string(),
    }
}

fn new_card_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
