use crate::blueprint::{Category, DEFAULT_CATEGORY};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed placement for one event. Only [`validate`] builds one from
/// untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementDecision {
    pub connections: Vec<String>,
    pub category: Category,
    pub reasoning: String,
    pub grid_col: i64,
    pub grid_row: i64,
    pub label: String,
}

impl PlacementDecision {
    pub fn with_position(mut self, col: i64, row: i64) -> Self {
        self.grid_col = col;
        self.grid_row = row;
        self
    }
}

/// Normalizes an untrusted answer. Never fails: anything missing or of the
/// wrong type falls back to a default, and a non-object `raw` behaves like an
/// empty mapping. `event_text` is the label fallback.
pub fn validate(raw: &Value, event_text: &str) -> PlacementDecision {
    let field = |key: &str| raw.as_object().and_then(|map| map.get(key));

    let connections = match field("connections") {
        Some(Value::Array(items)) => items.iter().filter_map(connection_id).collect(),
        _ => Vec::new(),
    };

    let category = match field("category") {
        Some(Value::String(value)) if !value.trim().is_empty() => Category::parse(value),
        _ => Category::parse(DEFAULT_CATEGORY),
    };

    let reasoning = match field("reasoning") {
        None | Some(Value::Null) => String::new(),
        Some(value) => text_of(value),
    };

    let label = match field("label") {
        None | Some(Value::Null) => String::new(),
        Some(value) => text_of(value).trim().to_string(),
    };
    let label = if label.is_empty() {
        event_text.to_string()
    } else {
        label
    };

    PlacementDecision {
        connections,
        category,
        reasoning,
        grid_col: grid_index(field("grid_col")),
        grid_row: grid_index(field("grid_row")),
        label,
    }
}

fn connection_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn grid_index(value: Option<&Value>) -> i64 {
    let Some(Value::Number(number)) = value else {
        return 0;
    };
    if let Some(int) = number.as_i64() {
        int
    } else if let Some(float) = number.as_f64() {
        // `as` truncates toward zero and saturates.
        float as i64
    } else {
        0
    }
}

/// Slice from the first `{` to the last `}`; the whole text when there is no
/// such span.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Extracts, parses and validates a free-text answer.
pub fn parse_answer(text: &str, event_text: &str) -> Result<PlacementDecision, serde_json::Error> {
    let raw: Value = serde_json::from_str(extract_json_object(text))?;
    Ok(validate(&raw, event_text))
}
