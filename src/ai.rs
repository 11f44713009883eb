//! Blocking client for the OpenAI-compatible chat-completion endpoint.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::AiConfig;
use crate::error::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, Error> {
        if config.api_key.is_empty() {
            return Err(Error::Ai(
                "no API key configured; set ai.api_key in config.toml or EDUPLAT_AI_KEY".into(),
            ));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Ai(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// One chat-completion round trip; returns the raw reply text.
    pub fn chat(&self, system: &str, user: &str) -> Result<String, Error> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.7,
            "max_tokens": 1000,
        });

        tracing::debug!(%url, model = %self.model, "sending chat completion request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Ai(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::Ai(format!("{}: {}", status, detail)));
        }

        let parsed: ChatResponse = response.json().map_err(|e| Error::Ai(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Ai("reply contained no choices".into()))?;

        tracing::debug!(len = content.len(), "received chat completion reply");
        Ok(content)
    }
}
