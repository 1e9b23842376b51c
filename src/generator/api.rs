//! OpenAI-compatible API backend for commit message text.
//!
//! Works with any server implementing the chat completions API:
//! - Ollama (`http://localhost:11434`)
//! - vLLM, llama.cpp server, etc.

use super::{MESSAGE_MARKER, MessageGenerator};
use crate::config::GeneratorConfig;
use crate::error::{Result, StreakError};
use std::time::Instant;
use tracing::info;

/// Generator calling `POST {api_url}/v1/chat/completions` once per prompt.
pub struct ApiGenerator {
    url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    agent: ureq::Agent,
}

impl ApiGenerator {
    /// Create a generator from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or model is empty, or the API key env var
    /// is configured but missing.
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(StreakError::Config("generator.api_url is empty".to_owned()));
        }
        if config.api_model.trim().is_empty() {
            return Err(StreakError::Config(
                "generator.api_model is empty".to_owned(),
            ));
        }

        let api_key = config.resolve_api_key()?;
        let url = completions_url(&config.api_url);

        info!("API generator configured: {url} model={}", config.api_model);

        Ok(Self {
            url,
            model: config.api_model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            agent: ureq::agent(),
        })
    }

    /// Resolved endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MessageGenerator for ApiGenerator {
    fn name(&self) -> &str {
        "api"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": self.max_tokens,
        });
        let body_str = serde_json::to_string(&body)
            .map_err(|e| StreakError::Generator(format!("JSON serialization failed: {e}")))?;

        let started = Instant::now();
        let mut req = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            let auth = format!("Bearer {key}");
            req = req.set("Authorization", &auth);
        }

        let response = req.send_string(&body_str).map_err(|e| match e {
            ureq::Error::Status(code, resp) => {
                let detail = resp.into_string().unwrap_or_default();
                StreakError::Generator(format!("API returned {code}: {}", detail.trim()))
            }
            other => StreakError::Generator(format!("API request failed: {other}")),
        })?;
        let text = response
            .into_string()
            .map_err(|e| StreakError::Generator(format!("cannot read API response: {e}")))?;

        let content = parse_completion(&text)?;
        info!(
            "API generated {} chars in {:.1}s",
            content.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(as_continuation(&content))
    }
}

/// Normalize a base URL (with or without `/v1`) to the completions endpoint.
pub(crate) fn completions_url(api_url: &str) -> String {
    let base = api_url.trim().trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}/v1/chat/completions")
}

/// Frame a chat reply as the continuation of the prompt's bullet list.
///
/// Chat models answer the prompt instead of continuing it, so a reply is often
/// the bare message (`feat(api): add endpoint`). Such a reply is returned behind
/// the marker; a reply that already carries one is returned as is.
pub(crate) fn as_continuation(reply: &str) -> String {
    if reply.contains(MESSAGE_MARKER) {
        return reply.to_owned();
    }
    format!("{MESSAGE_MARKER}{}", reply.trim_start())
}

/// Extract `choices[0].message.content` from a completions response body.
pub(crate) fn parse_completion(body: &str) -> Result<String> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| StreakError::Generator(format!("JSON parse error: {e}")))?;

    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| StreakError::Generator("response has no choices[0].message.content".to_owned()))
}
