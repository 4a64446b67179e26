use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing API key; set {0}")]
    MissingApiKey(String),
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation service returned no text")]
    Empty,
    #[error("generation is disabled in offline mode")]
    Offline,
}

impl GenerationError {
    /// Errors that mean the setup is wrong, as opposed to the service misbehaving.
    pub fn is_config(&self) -> bool {
        matches!(self, GenerationError::MissingApiKey(_))
    }
}

/// Anything that turns a prompt into text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Read the key from `env_var`; an unset or blank variable is an error.
    pub fn from_env(env_var: &str) -> Result<Self, GenerationError> {
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(env_var.to_string()))?;
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            timeout: Duration::from_secs(60),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = Req {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };
        debug!(model = %self.config.model, prompt_len = prompt.len(), "requesting generation");

        let resp = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }

        let out: Value = resp.json().await?;
        extract_text(&out).ok_or(GenerationError::Empty)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerationError>> + Send {
        self.complete(prompt)
    }
}

/// `candidates[0].content.parts[0].text`, if present and non-blank.
pub fn extract_text(response: &Value) -> Option<String> {
    #[derive(Deserialize)]
    struct Resp {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }
    #[derive(Deserialize)]
    struct Candidate {
        content: Option<CandidateContent>,
    }
    #[derive(Deserialize)]
    struct CandidateContent {
        #[serde(default)]
        parts: Vec<CandidatePart>,
    }
    #[derive(Deserialize)]
    struct CandidatePart {
        text: Option<String>,
    }

    let resp: Resp = serde_json::from_value(response.clone()).ok()?;
    let text = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text?;
    (!text.trim().is_empty()).then_some(text)
}

/// Never reaches the network; every call fails with `Offline`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl TextGenerator for OfflineGenerator {
    fn generate(&self, _prompt: &str) -> impl Future<Output = Result<String, GenerationError>> + Send {
        std::future::ready(Err(GenerationError::Offline))
    }
}
