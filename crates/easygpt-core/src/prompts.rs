//! System prompts that ask the model for card-shaped JSON.

pub const CARDS_JSON_INSTRUCTION: &str = concat!(
    "You are a helpful assistant. Respond ONLY with valid JSON in the schema: ",
    "{\n  \"cards\": [\n    {\n      \"id\": \"string\",\n      \"title\": \"string\",\n",
    "      \"content\": \"string\",\n      \"kind\": \"text\"\n    }\n  ]\n}. ",
    "Do not include any surrounding prose. Keep titles short and content concise."
);

pub const FOLLOWUP_JSON_INSTRUCTION: &str = concat!(
    "You are answering a clarifying question about a specific card. ",
    "Respond ONLY with valid JSON in the schema: ",
    "{\n  \"card\": {\n    \"id\": \"string\",\n    \"title\": \"string\",\n",
    "    \"content\": \"string\",\n    \"kind\": \"text\"\n  }\n}. ",
    "The response should be a single short paragraph directly addressing the question."
);

/// System prompt for `/generate`, with the caller's own instruction first.
pub fn build_cards_system_prompt(user_system: Option<&str>) -> String {
    match user_system.filter(|s| !s.is_empty()) {
        Some(user_system) => format!("{user_system}\n\n{CARDS_JSON_INSTRUCTION}"),
        None => CARDS_JSON_INSTRUCTION.to_string(),
    }
}

/// System prompt for `/followup`, embedding the card the question is about.
pub fn build_followup_system_prompt(
    current_card_title: &str,
    current_card_content: &str,
    user_system: Option<&str>,
) -> String {
    let context = format!(
        "Context for this clarifying question: The current step is '{current_card_title}'. Content: '{current_card_content}'."
    );
    match user_system.filter(|s| !s.is_empty()) {
        Some(user_system) => {
            format!("{user_system}\n\n{context}\n\n{FOLLOWUP_JSON_INSTRUCTION}")
        }
        None => format!("{context}\n\n{FOLLOWUP_JSON_INSTRUCTION}"),
    }
}
