// src/tests/utils.rs
//
// In-memory collaborators for scenario tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::agents::{AgentError, KeywordLinkSelector, LinkSelector, ListingExtractor};
use crate::domain::{AddressRecord, RawListing};
use crate::geos::{GeocodeError, Geocoder};
use crate::pipeline::context::PipelineOptions;
use crate::pipeline::PipelineContext;
use crate::scraper::{PageContent, PageFetcher, ScraperError};
use crate::store::CsvStore;

enum FakePage {
    Html(String),
    Fail,
    Panic(&'static str),
}

/// Serves canned pages by exact URL; anything unknown is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, FakePage>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), FakePage::Html(html.to_string()));
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), FakePage::Fail);
        self
    }

    pub fn panicking(mut self, url: &str, message: &'static str) -> Self {
        self.pages.insert(url.to_string(), FakePage::Panic(message));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|(url, _)| url).collect()
    }
}

impl PageFetcher for Arc<FakeFetcher> {
    fn fetch_rendered_page(&self, url: &str, wait: Duration) -> Result<PageContent, ScraperError> {
        self.calls.lock().unwrap().push((url.to_string(), wait));

        match self.pages.get(url) {
            Some(FakePage::Html(html)) => Ok(PageContent::new(url, html.clone())),
            Some(FakePage::Fail) => {
                Err(ScraperError::Network(format!("connection reset by {url}")))
            }
            Some(FakePage::Panic(message)) => panic!("{message}"),
            None => Err(ScraperError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Always answers with the same URL.
pub struct FixedSelector(pub Option<String>);

impl LinkSelector for FixedSelector {
    fn select_listing_index_url(
        &self,
        _candidates: &BTreeSet<String>,
    ) -> Result<Option<String>, AgentError> {
        Ok(self.0.clone())
    }
}

type ExtractFn = dyn Fn(&str) -> Result<Vec<RawListing>, AgentError> + Send + Sync;

/// Extraction driven by a closure over the chunk text; every chunk is logged.
pub struct FakeExtractor {
    respond: Box<ExtractFn>,
    chunks: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new(
        respond: impl Fn(&str) -> Result<Vec<RawListing>, AgentError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            chunks: Mutex::new(Vec::new()),
        })
    }

    /// Returns `listings` for every chunk mentioning `marker`, nothing otherwise.
    pub fn on_marker(marker: &'static str, listings: Vec<RawListing>) -> Arc<Self> {
        Self::new(move |chunk| {
            if chunk.contains(marker) {
                Ok(listings.clone())
            } else {
                Ok(Vec::new())
            }
        })
    }

    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }
}

impl ListingExtractor for FakeExtractor {
    fn extract_listings(&self, chunk: &str) -> Result<Vec<RawListing>, AgentError> {
        self.chunks.lock().unwrap().push(chunk.to_string());
        (self.respond)(chunk)
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    known: HashMap<String, AddressRecord>,
    calls: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn with(mut self, address: &str, lat: f64, lon: f64, city: &str) -> Self {
        self.known.insert(
            address.to_string(),
            AddressRecord {
                full_address: format!("{address}, {city}"),
                city: city.to_string(),
                latitude: Some(lat),
                longitude: Some(lon),
                ..Default::default()
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Geocoder for FakeGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<AddressRecord>, GeocodeError> {
        self.calls.lock().unwrap().push(address.to_string());
        Ok(self.known.get(address).cloned())
    }
}

pub fn listing(name: &str, address: Option<&str>, price: &str) -> RawListing {
    RawListing {
        name: Some(name.to_string()),
        address: address.map(str::to_string),
        price: Some(price.to_string()),
        ..Default::default()
    }
}

/// A home page linking to `paths` on `origin`, plus one off-site link.
pub fn home_page(origin: &str, paths: &[&str]) -> String {
    let links: String = paths
        .iter()
        .map(|path| format!(r#"<a href="{origin}{path}">{path}</a>"#))
        .collect();
    format!(
        r#"<html><body><nav>{links}<a href="https://elsewhere.test/">x</a></nav></body></html>"#
    )
}

pub fn test_options() -> PipelineOptions {
    PipelineOptions {
        waiting_time: Duration::ZERO,
        max_words: 50,
        save_attempts: 2,
        inline_geocoding: false,
    }
}

/// Context over fakes with its sinks in a fresh temp dir. Keep the dir alive
/// for the duration of the test.
pub fn test_context(
    fetcher: &Arc<FakeFetcher>,
    extractor: Option<Arc<dyn ListingExtractor>>,
) -> (PipelineContext, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = PipelineContext {
        fetcher: Box::new(fetcher.clone()),
        link_selector: Arc::new(KeywordLinkSelector),
        extractor,
        geocoder: None,
        store: CsvStore::new(dir.path()),
        options: test_options(),
    };
    (ctx, dir)
}

pub fn as_extractor(fake: &Arc<FakeExtractor>) -> Option<Arc<dyn ListingExtractor>> {
    let extractor: Arc<dyn ListingExtractor> = fake.clone();
    Some(extractor)
}
