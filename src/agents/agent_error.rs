use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),
    #[error("Agent reported an error: {0}")]
    Reported(String),
    #[error("AI provider configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::RequestFailed(e.to_string())
    }
}
