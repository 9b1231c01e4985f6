use super::{
    ListingGenerator,
    error::{LlmError, Result},
    prompt::LISTING_SYSTEM_PROMPT,
    types::{ChatRequest, ChatResponseRaw, Message},
};
use crate::config::Llm;
use reqwest::blocking::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Blocking client for an OpenAI-compatible chat completion endpoint.
pub struct ChatClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ChatClient {
    /// Settings are copied in once; the client never reads the environment.
    pub fn new(cfg: &Llm, api_key: impl Into<String>) -> Result<Self> {
        let base_url = cfg.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(LlmError::Config("llm.base_url is empty".into()));
        }
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".into()));
        }
        if cfg.model.trim().is_empty() {
            return Err(LlmError::Config("llm.model is empty".into()));
        }
        let mut builder = Client::builder();
        if cfg.request_timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.request_timeout_seconds));
        }
        let http = builder
            .build()
            .map_err(|e| LlmError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            base_url,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The two-message exchange sent for one image's text.
    pub fn listing_request(&self, text: &str) -> ChatRequest {
        let mut req = ChatRequest::new(&self.model)
            .message(Message::system(LISTING_SYSTEM_PROMPT))
            .message(Message::user(text));
        req.temperature = self.temperature;
        req.max_tokens = self.max_tokens;
        req
    }

    pub fn chat_completion(&self, request: &ChatRequest) -> Result<String> {
        let start = Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|e| {
                warn!(error = %e, "chat completion request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = %status, error = %body, "chat completion API error");
            return Err(LlmError::Api(format!("{status}: {body}")));
        }

        let raw: ChatResponseRaw = response
            .json()
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        if let Some(usage) = raw.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        let content = raw
            .first_content()
            .ok_or_else(|| LlmError::Api("response has no message content".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            chars = content.len(),
            "chat completion"
        );
        Ok(content)
    }
}

impl ListingGenerator for ChatClient {
    fn generate(&self, text: &str) -> anyhow::Result<String> {
        let req = self.listing_request(text);
        Ok(self.chat_completion(&req)?)
    }
}
