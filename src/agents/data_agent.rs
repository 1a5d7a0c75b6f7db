// src/agents/data_agent.rs

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::{AgentError, AgentReply, ChatClient};
use crate::domain::RawListing;

/// Turns one chunk of page text into listing entries.
pub trait ListingExtractor: Send + Sync {
    fn extract_listings(&self, chunk: &str) -> Result<Vec<RawListing>, AgentError>;
}

const DATA_PROMPT: &str = r#"You extract room and rental listings from text scraped off a hotel or
property website. For every room or unit that is clearly described, give its
name, its address or location, the number of beds and baths, the price with
currency and the availability, leaving out any field the text does not state.

Answer with JSON only, no other text:
{"status": 1, "message": "Retrieved the data", "data": [
  {"name": "...", "address": "...", "beds": "...", "bath": "...",
   "price": "...", "availability": "..."}
]}
when listings are present,
{"status": 0, "message": "No data found", "data": null}
when the text holds no listings, and
{"status": -1, "message": "<what went wrong>", "data": null}
when the request cannot be processed.
Only include entries that have a name or an address."#;

pub struct AgentListingExtractor {
    client: Arc<dyn ChatClient>,
}

impl AgentListingExtractor {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

impl ListingExtractor for AgentListingExtractor {
    fn extract_listings(&self, chunk: &str) -> Result<Vec<RawListing>, AgentError> {
        info!(words = chunk.split_whitespace().count(), "Initiated data retriever agent");

        let content = format!("Extract the room data from here:\n{chunk}");
        let text = self.client.complete(DATA_PROMPT, &content)?;

        match AgentReply::decode(&text, "data")? {
            AgentReply::Ok(Value::Null) => Ok(Vec::new()),
            // A lone object instead of a list still counts as one entry.
            AgentReply::Ok(data @ Value::Object(_)) => Ok(vec![parse_listing(data)?]),
            AgentReply::Ok(Value::Array(items)) => {
                let mut listings = Vec::with_capacity(items.len());
                for item in items {
                    match parse_listing(item) {
                        Ok(listing) => listings.push(listing),
                        Err(e) => warn!(error = %e, "Skipping malformed listing entry"),
                    }
                }
                Ok(listings)
            }
            AgentReply::Ok(other) => Err(AgentError::MalformedReply(format!(
                "expected a list of listings, got {other}"
            ))),
            AgentReply::Empty(message) => {
                info!(%message, "Data retriever agent found nothing in chunk");
                Ok(Vec::new())
            }
            AgentReply::Error(message) => Err(AgentError::Reported(message)),
        }
    }
}

fn parse_listing(value: Value) -> Result<RawListing, AgentError> {
    serde_json::from_value(value).map_err(|e| AgentError::MalformedReply(e.to_string()))
}

/// Splits `text` into consecutive chunks of at most `max_words` words, joined
/// by single spaces.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words)
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Runs the extractor over every chunk of `text` in order. A chunk that fails
/// is logged and skipped; the rest still count.
pub fn retrieve_listings(
    extractor: &dyn ListingExtractor,
    text: &str,
    max_words: usize,
) -> Vec<RawListing> {
    let chunks = chunk_words(text, max_words);
    let total = chunks.len();
    let mut listings = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        match extractor.extract_listings(chunk) {
            Ok(found) => {
                info!(chunk = index + 1, total, found = found.len(), "Processed chunk");
                listings.extend(found);
            }
            Err(e) => warn!(chunk = index + 1, total, error = %e, "Chunk extraction failed"),
        }
    }

    info!(total_results = listings.len(), "Processed all chunks");
    listings
}
