//! docqa-generate
//!
//! `Generator` over the Gemini `generateContent` REST endpoint.

use anyhow::{anyhow, bail, Context as _};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::{Duration, Instant};
use tracing::debug;

use docqa_core::config::GenerationSettings;
use docqa_core::error::{Error, Result};
use docqa_core::traits::Generator;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl GeminiGenerator {
    /// Fails with `Error::Config` if `api_key` is blank.
    pub fn new(api_key: String, model: impl Into<String>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!("{ENV_GEMINI_API_KEY} is empty")));
        }
        Ok(Self {
            client: Client::default(),
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE.to_owned(),
            timeout: None,
        })
    }

    /// Key from `generation.api_key`, falling back to `GEMINI_API_KEY`.
    pub fn from_config_or_env(settings: &GenerationSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| env::var(ENV_GEMINI_API_KEY).ok())
            .ok_or_else(|| Error::Config(format!("{ENV_GEMINI_API_KEY} or generation.api_key must be set")))?;
        Ok(Self::new(api_key, settings.model.clone())?.with_timeout(Duration::from_secs(settings.timeout_secs)))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Points requests at another host, e.g. a local proxy.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn model(&self) -> &str { &self.model }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> anyhow::Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback {
            Some(feedback) => Err(anyhow!("prompt was blocked: {feedback}")),
            None => Err(anyhow!("response contained no candidates")),
        };
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        bail!("empty answer (finish reason: {})", candidate.finish_reason.as_deref().unwrap_or("unknown"));
    }
    Ok(text)
}

/// Error text for a non-success response; a body that could not be read is
/// reported as such rather than dropped.
fn failure_message<E: std::fmt::Display>(status: StatusCode, body: std::result::Result<String, E>) -> String {
    match body {
        Ok(text) => format!("Gemini API request failed with status {status}: {text}"),
        Err(e) => format!("Gemini API request failed with status {status} (response body unreadable: {e})"),
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str { "gemini" }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let start = Instant::now();
        let mut request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.context("Gemini request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            bail!(failure_message(status, response.text().await));
        }

        let body: GenerateResponse = response.json().await.context("Failed to parse Gemini response")?;
        let text = extract_text(body)?;
        debug!(model = %self.model, elapsed = ?start.elapsed(), answer_chars = text.len(), "gemini answered");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> anyhow::Result<String> {
        extract_text(serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let raw = r#"{"candidates":[
            {"content":{"role":"model","parts":[{"text":"Plant "},{"text":"in spring."}]},"finishReason":"STOP"},
            {"content":{"parts":[{"text":"ignored"}]}}
        ]}"#;
        assert_eq!(parse(raw).unwrap(), "Plant in spring.");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(parse(raw).unwrap_err().to_string().contains("blocked"));
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let raw = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        assert!(parse(raw).unwrap_err().to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn failure_message_keeps_body_or_read_error() {
        let ok: std::result::Result<String, String> = Ok("{\"error\":\"quota\"}".into());
        let msg = failure_message(StatusCode::TOO_MANY_REQUESTS, ok);
        assert!(msg.contains("429") && msg.contains("quota"));

        let unreadable: std::result::Result<String, String> = Err("connection reset".into());
        let msg = failure_message(StatusCode::BAD_GATEWAY, unreadable);
        assert!(msg.contains("502") && msg.contains("connection reset"));
    }

    #[test]
    fn request_carries_prompt() {
        let body = GeminiGenerator::request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn endpoint_includes_model() {
        let g = GeminiGenerator::new("k".into(), "gemini-2.5-flash").unwrap().with_base_url("http://localhost:9/v1/");
        assert_eq!(g.endpoint(), "http://localhost:9/v1/gemini-2.5-flash:generateContent");
    }

    #[test]
    fn blank_key_is_config_error() {
        assert!(matches!(GeminiGenerator::new("  ".into(), "gemini-2.5-flash"), Err(Error::Config(_))));
    }
}
