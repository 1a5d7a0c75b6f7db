// src/pipeline/context.rs

use std::sync::Arc;
use std::time::Duration;

use crate::agents::{
    chat_client_from_settings, AgentLinkSelector, AgentListingExtractor, KeywordLinkSelector,
    LinkSelector, ListingExtractor,
};
use crate::config::Settings;
use crate::errors::PipelineError;
use crate::geos::{geocoder_from_settings, Geocoder};
use crate::scraper::{fetcher_from_settings, PageFetcher};
use crate::store::CsvStore;

/// Waits and bounds for one site run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub waiting_time: Duration,
    pub max_words: usize,
    pub save_attempts: usize,
    pub inline_geocoding: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            waiting_time: Duration::from_secs(30),
            max_words: 1000,
            save_attempts: 2,
            inline_geocoding: false,
        }
    }
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            waiting_time: settings.waiting_time,
            max_words: settings.max_words,
            save_attempts: settings.save_attempts,
            inline_geocoding: settings.inline_geocoding,
        }
    }
}

/// Everything a pipeline or retry task needs. Built once, shared by reference
/// across the pool.
pub struct PipelineContext {
    pub fetcher: Box<dyn PageFetcher>,
    pub link_selector: Arc<dyn LinkSelector>,
    /// `None` without a chat provider; extraction then fails its stage.
    pub extractor: Option<Arc<dyn ListingExtractor>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub store: CsvStore,
    pub options: PipelineOptions,
}

impl PipelineContext {
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let fetcher = fetcher_from_settings(settings)?;

        let mut link_selector: Arc<dyn LinkSelector> = Arc::new(KeywordLinkSelector);
        let mut extractor: Option<Arc<dyn ListingExtractor>> = None;
        if let Some(client) = chat_client_from_settings(settings)? {
            link_selector = Arc::new(AgentLinkSelector::new(client.clone()));
            extractor = Some(Arc::new(AgentListingExtractor::new(client)));
        }

        let geocoder = if settings.inline_geocoding {
            Some(geocoder_from_settings(settings)?)
        } else {
            None
        };

        Ok(Self {
            fetcher,
            link_selector,
            extractor,
            geocoder,
            store: CsvStore::new(&settings.results_dir),
            options: PipelineOptions::from(settings),
        })
    }
}
