// src/agents/link_agent.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::{AgentError, AgentReply, ChatClient};

/// Path fragments that usually mark a page listing every room or unit.
/// Earlier entries are stronger signals.
pub const LISTING_PATH_HINTS: &[&str] = &[
    "/all-rooms",
    "/rooms",
    "/find-rooms",
    "/room-list",
    "/hotel-rooms",
    "/homes-for-rent",
    "/rentals",
    "/listings",
    "/properties",
    "/availability",
    "/floor-plans",
    "/apartments",
];

/// Picks the page that lists all rooms/units out of a site's links.
pub trait LinkSelector: Send + Sync {
    fn select_listing_index_url(
        &self,
        candidates: &BTreeSet<String>,
    ) -> Result<Option<String>, AgentError>;
}

fn link_prompt() -> String {
    format!(
        r#"You analyse the list of URLs collected from one hotel or rental website.
Return the single URL of the page that lists all available rooms or units, with
their types, rates and descriptions. Such pages usually have paths like {hints}.

Answer with JSON only, no other text:
{{"status": 1, "message": "Found the listing page", "url": "<the url>"}}
when a suitable URL exists,
{{"status": 0, "message": "No suitable URL", "url": null}}
when none of the URLs fits, and
{{"status": -1, "message": "<what went wrong>", "url": null}}
when the request cannot be processed.
The URL must be copied exactly from the list."#,
        hints = LISTING_PATH_HINTS.join(", ")
    )
}

/// Asks a chat model to choose the listing index.
pub struct AgentLinkSelector {
    client: Arc<dyn ChatClient>,
    prompt: String,
}

impl AgentLinkSelector {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            prompt: link_prompt(),
        }
    }
}

impl LinkSelector for AgentLinkSelector {
    fn select_listing_index_url(
        &self,
        candidates: &BTreeSet<String>,
    ) -> Result<Option<String>, AgentError> {
        info!(candidates = candidates.len(), "Initiated link retriever agent");

        let listing = candidates
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let content = format!("Find the room page URL among these:\n{listing}");

        let text = self.client.complete(&self.prompt, &content)?;

        match AgentReply::decode(&text, "url")? {
            AgentReply::Ok(Value::String(url)) if !url.trim().is_empty() => {
                info!(url = %url, "Link retriever agent picked a URL");
                Ok(Some(url.trim().to_string()))
            }
            AgentReply::Ok(other) => {
                warn!(payload = %other, "Link retriever agent returned no usable URL");
                Ok(None)
            }
            AgentReply::Empty(message) => {
                warn!(%message, "Link retriever agent found no suitable URL");
                Ok(None)
            }
            AgentReply::Error(message) => Err(AgentError::Reported(message)),
        }
    }
}

/// Offline selector: the candidate matching the strongest path hint, shortest
/// URL first among equals.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordLinkSelector;

impl KeywordLinkSelector {
    fn rank(url: &str) -> Option<usize> {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| url.to_ascii_lowercase());
        LISTING_PATH_HINTS
            .iter()
            .position(|hint| path.contains(hint))
    }
}

impl LinkSelector for KeywordLinkSelector {
    fn select_listing_index_url(
        &self,
        candidates: &BTreeSet<String>,
    ) -> Result<Option<String>, AgentError> {
        let best = candidates
            .iter()
            .filter_map(|url| Self::rank(url).map(|rank| (rank, url.len(), url)))
            .min()
            .map(|(_, _, url)| url.clone());

        match &best {
            Some(url) => info!(url = %url, "Keyword selector picked a URL"),
            None => warn!(candidates = candidates.len(), "No candidate matches a listing path"),
        }
        Ok(best)
    }
}
