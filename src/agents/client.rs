// src/agents/client.rs

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::AgentError;
use crate::config::{AiProvider, Settings};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A single-turn chat completion: a role prompt plus the user content.
pub trait ChatClient: Send + Sync {
    fn complete(&self, role_prompt: &str, content: &str) -> Result<String, AgentError>;
}

fn build_client() -> Result<Client, AgentError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AgentError::RequestFailed(e.to_string()))
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

fn api_error(provider: &str, resp: reqwest::blocking::Response) -> AgentError {
    let status = resp.status();
    let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
    AgentError::ApiError(format!("{provider} API error: {status} - {body}"))
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GroqPayload<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

#[derive(Deserialize)]
struct GroqMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqClient {
    api_key: String,
    model: String,
    delay: Duration,
    client: Client,
}

impl GroqClient {
    pub fn new(api_key: String, model: String, delay: Duration) -> Result<Self, AgentError> {
        Ok(Self {
            api_key,
            model,
            delay,
            client: build_client()?,
        })
    }
}

impl ChatClient for GroqClient {
    fn complete(&self, role_prompt: &str, content: &str) -> Result<String, AgentError> {
        info!(model = %self.model, "Initiating Groq AI connection");
        pause(self.delay);

        let payload = GroqPayload {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: role_prompt,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };

        let resp = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()?;

        if !resp.status().is_success() {
            return Err(api_error("Groq", resp));
        }

        let body: GroqResponse = resp.json()?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty());

        match text {
            Some(text) => {
                debug!(preview = %preview(&text), "Received Groq AI response");
                Ok(text)
            }
            None => {
                warn!("Groq AI returned an empty response");
                Err(AgentError::EmptyResponse)
            }
        }
    }
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPayload<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: String,
}

/// Google Gemini `generateContent`; the role prompt goes first in the same turn.
pub struct GeminiClient {
    api_key: String,
    model: String,
    delay: Duration,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, delay: Duration) -> Result<Self, AgentError> {
        Ok(Self {
            api_key,
            model,
            delay,
            client: build_client()?,
        })
    }
}

impl ChatClient for GeminiClient {
    fn complete(&self, role_prompt: &str, content: &str) -> Result<String, AgentError> {
        info!(model = %self.model, "Initiating Gemini AI connection");
        pause(self.delay);

        let payload = GeminiPayload {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: role_prompt }, GeminiPart { text: content }],
            }],
        };

        let resp = self
            .client
            .post(format!("{GEMINI_BASE_URL}/{}:generateContent", self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()?;

        if !resp.status().is_success() {
            return Err(api_error("Gemini", resp));
        }

        let body: GeminiResponse = resp.json()?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!("Gemini AI returned an empty response");
            return Err(AgentError::EmptyResponse);
        }

        debug!(preview = %preview(&text), "Received Gemini AI response");
        Ok(text)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}

/// The configured chat provider, or `None` for the offline keyword strategy.
pub fn chat_client_from_settings(
    settings: &Settings,
) -> Result<Option<Arc<dyn ChatClient>>, AgentError> {
    let missing = |key: &str| AgentError::Config(format!("{key} environment variable not set"));

    match settings.ai_provider {
        AiProvider::Groq => {
            let key = settings
                .groq_api_key
                .clone()
                .ok_or_else(|| missing("GROQ_API_KEY"))?;
            let client =
                GroqClient::new(key, settings.groq_model.clone(), settings.ai_request_delay)?;
            Ok(Some(Arc::new(client)))
        }
        AiProvider::Gemini => {
            let key = settings
                .gemini_api_key
                .clone()
                .ok_or_else(|| missing("GEMINI_API_KEY"))?;
            let client =
                GeminiClient::new(key, settings.gemini_model.clone(), settings.ai_request_delay)?;
            Ok(Some(Arc::new(client)))
        }
        AiProvider::Keyword => Ok(None),
    }
}
