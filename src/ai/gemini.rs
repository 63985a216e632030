//! Gemini-backed `AiClient` implementation.
//!
//! Talks to the `generateContent` REST endpoint directly with `reqwest`
//! rather than a provider SDK, mirroring the rest of the crate's outbound
//! HTTP calls (messenger replies, pricing fetches). Prompts ask for strict
//! JSON back so parsing doesn't need a second LLM round-trip.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::ai::token_estimation::estimate_tokens;
use crate::ai::{AiClient, ParsedExpense, TokenMetadata, UNCATEGORIZED};
use crate::error::{Error, Result};

const LLM_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, api_key, model })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }

    async fn generate(&self, prompt: &str) -> Result<(String, TokenMetadata)> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(Error::Reqwest)?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "gemini returned status {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(Error::Reqwest)?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Transient("gemini response had no candidates".to_string()))?;

        let tokens = match parsed.usage_metadata {
            Some(usage) => TokenMetadata {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                estimated: false,
            },
            None => TokenMetadata {
                input_tokens: estimate_tokens(prompt),
                output_tokens: estimate_tokens(&text),
                estimated: true,
            },
        };

        Ok((text, tokens))
    }
}

#[async_trait]
impl AiClient for GeminiClient {
    async fn parse_expense(&self, text: &str, user_id: &str) -> Result<(Vec<ParsedExpense>, TokenMetadata)> {
        let prompt = format!(
            "Extract expenses from this message as a JSON array of objects with \
             fields amount (number), description (string), currency (string or null), \
             date_hint (string or null, e.g. \"yesterday\"). User: {user_id}. Message: {text}"
        );

        let (raw, tokens) = self.generate(&prompt).await?;
        let parsed: Vec<ParsedExpense> = serde_json::from_str(&raw)
            .map_err(|e| Error::Transient(format!("gemini returned unparseable json: {e}")))?;

        Ok((parsed, tokens))
    }

    async fn suggest_category(&self, description: &str, user_id: &str) -> Result<(String, TokenMetadata)> {
        let prompt = format!(
            "Suggest a single short expense category name (one or two words) for \
             this description, respond as a JSON string only. User: {user_id}. Description: {description}"
        );

        let (raw, tokens) = self.generate(&prompt).await?;
        let category: String = serde_json::from_str(raw.trim())
            .unwrap_or_else(|_| UNCATEGORIZED.to_string());

        Ok((category, tokens))
    }

    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: i64,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: i64,
}
