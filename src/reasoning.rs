//! Reasoning step: builds the placement prompt, sends it to a language model
//! and validates the answer into a [`PlacementDecision`].

use crate::blueprint::LabelIndex;
use crate::config::{ApiKey, GridConfig, ReasoningConfig};
use crate::placement::{PlacementDecision, parse_answer};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

pub const CATEGORIES: [&str; 5] = ["theme", "concept", "movement", "political", "digital"];

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("missing API credential: pass --api-key or set GOOGLE_API_KEY")]
    MissingCredential,
    #[error("reasoning request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reasoning service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("reasoning service returned no text")]
    EmptyResponse,
    #[error("reasoning answer is not a JSON object: {0}")]
    MalformedAnswer(#[source] serde_json::Error),
}

pub trait ReasoningProvider {
    /// Sends `prompt` and returns the model's raw text.
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: ApiKey,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

impl GeminiClient {
    pub fn new(config: &ReasoningConfig, api_key: Option<&ApiKey>) -> Result<Self, ReasoningError> {
        let api_key = api_key.cloned().ok_or(ReasoningError::MissingCredential)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

impl ReasoningProvider for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        debug!(%url, prompt_chars = prompt.chars().count(), "sending reasoning request");

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            error!(status = status.as_u16(), "reasoning service error");
            return Err(ReasoningError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(ReasoningError::MalformedAnswer)?;
        if let Some(usage) = &parsed.usage_metadata {
            info!(
                prompt_tokens = ?usage.prompt_token_count,
                response_tokens = ?usage.candidates_token_count,
                "reasoning usage"
            );
        }
        let answer: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if answer.trim().is_empty() {
            return Err(ReasoningError::EmptyResponse);
        }
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// `  id: label` lines for the first `max_nodes` blueprint nodes.
pub fn blueprint_context(labels: &LabelIndex, max_nodes: usize) -> String {
    labels
        .iter()
        .take(max_nodes)
        .map(|(id, label)| format!("  {id}: {label}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(event: &str, search_summary: &str, context: &str, grid: GridConfig) -> String {
    let last_col = grid.cols.saturating_sub(1);
    let last_row = grid.rows.saturating_sub(1);
    let categories = CATEGORIES.join(" / ");
    format!(
        r#"You are an expert on a thematic blueprint graph of art and philosophy. The graph contains theme, concept, art movement, political and digital nodes.
Blueprint nodes (id: label):
{context}

Real-world event supplied by the user: {event}

Related information found by search:
{search_summary}

Analyse how this event relates to the existing blueprint nodes and decide:
1. connections: ids of the existing nodes the event should connect to (2-5 ids, taken from the list above)
2. category: one of {categories}
3. reasoning: a short explanation (1-3 sentences)
4. grid_col and grid_row: integers from 0 to {last_col} and 0 to {last_row} ({cols}x{rows} grid) naming the cell where the new node belongs
5. label: a short display name for the new node; it may equal the event or be more concise

Return ONLY valid JSON in exactly this format, with no other text:
{{"connections": ["id1", "id2"], "category": "concept", "reasoning": "why", "grid_col": 4, "grid_row": 7, "label": "short name"}}
"#,
        cols = grid.cols,
        rows = grid.rows,
    )
}

/// Prompt → model → JSON extraction → validation.
pub fn request_placement<R: ReasoningProvider + ?Sized>(
    provider: &R,
    event: &str,
    search_summary: &str,
    context: &str,
    grid: GridConfig,
) -> Result<PlacementDecision, ReasoningError> {
    let prompt = build_prompt(event, search_summary, context, grid);
    info!(model = provider.model_name(), "requesting placement");
    let answer = provider.complete(&prompt)?;
    debug!(answer_chars = answer.chars().count(), "received placement answer");
    parse_answer(&answer, event).map_err(ReasoningError::MalformedAnswer)
}
