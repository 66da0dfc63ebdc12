//! Text generation collaborator (OpenAI-compatible chat completions).

use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextGenError {
    #[error("text generation request failed: {0}")]
    Request(String),

    #[error("text generation returned HTTP {0}")]
    HttpStatus(u16),

    #[error("text generation response had no message content")]
    EmptyResponse,
}

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 300,
        }
    }
}

/// Produces free text from a system instruction and a user prompt.
pub trait TextGenerator {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, TextGenError>;
}

/// Chat-completions client.
pub struct ChatCompletions {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl ChatCompletions {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        params: GenerationParams,
    ) -> Result<Self, TextGenError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TextGenError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            params,
        })
    }

    fn build_body(&self, system: &str, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        })
    }
}

/// Assistant content of an OpenAI-style response.
fn parse_content(response: &Value) -> Option<&str> {
    response["choices"][0]["message"]["content"].as_str()
}

impl TextGenerator for ChatCompletions {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, TextGenError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.build_body(system, prompt))
            .send()
            .map_err(|e| TextGenError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TextGenError::HttpStatus(status.as_u16()));
        }

        let body: Value = resp
            .json()
            .map_err(|e| TextGenError::Request(e.to_string()))?;
        parse_content(&body)
            .map(str::to_string)
            .ok_or(TextGenError::EmptyResponse)
    }
}
