mod agent_error;
mod client;
mod data_agent;
mod link_agent;
mod reply;

pub use agent_error::AgentError;
pub use client::{chat_client_from_settings, ChatClient};
pub use data_agent::{retrieve_listings, AgentListingExtractor, ListingExtractor};
pub use link_agent::{AgentLinkSelector, KeywordLinkSelector, LinkSelector};
pub use reply::AgentReply;
