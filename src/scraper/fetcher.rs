// fetcher.rs
use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tracing::{debug, info, warn};

use super::{PageContent, ScraperError};
use crate::config::{ScraperKind, Settings};

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/121.0 Safari/537.36"
);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(360);

/// ZenRows rejects render waits above 30s.
const ZENROWS_MAX_WAIT_MS: u128 = 30_000;

/// Fetches a page after giving client-side scripts `wait` to render.
pub trait PageFetcher: Send + Sync {
    fn fetch_rendered_page(&self, url: &str, wait: Duration) -> Result<PageContent, ScraperError>;
}

fn build_client() -> Result<Client, ScraperError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ScraperError::Network(e.to_string()))
}

fn checked_body(url: &str, html: String) -> Result<PageContent, ScraperError> {
    if html.trim().is_empty() {
        return Err(ScraperError::EmptyPage(url.to_string()));
    }
    Ok(PageContent::new(url, html))
}

/// Plain GET. Suitable for server-rendered sites; it has nothing to wait for.
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new() -> Result<Self, ScraperError> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl PageFetcher for DirectFetcher {
    fn fetch_rendered_page(&self, url: &str, _wait: Duration) -> Result<PageContent, ScraperError> {
        info!(url, "Initiated scraper");
        let start = Instant::now();

        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = resp.text()?;
        debug!(url, elapsed = ?start.elapsed(), bytes = html.len(), "Fetched page");
        checked_body(url, html)
    }
}

/// Renders pages through the ZenRows API so JavaScript-built listings are present.
pub struct ZenRowsFetcher {
    client: Client,
    api_key: String,
}

impl ZenRowsFetcher {
    pub fn new(api_key: String) -> Result<Self, ScraperError> {
        Ok(Self {
            client: build_client()?,
            api_key,
        })
    }
}

impl PageFetcher for ZenRowsFetcher {
    fn fetch_rendered_page(&self, url: &str, wait: Duration) -> Result<PageContent, ScraperError> {
        info!(url, wait_secs = wait.as_secs(), "Initiated rendered scrape");
        let start = Instant::now();

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

        let wait_ms = wait.as_millis().min(ZENROWS_MAX_WAIT_MS);

        let mut params = HashMap::new();
        params.insert("url", url.to_string());
        params.insert("apikey", self.api_key.clone());
        params.insert("js_render", "true".to_string());
        params.insert("original_status", "true".to_string());
        if wait_ms > 0 {
            params.insert("wait", wait_ms.to_string());
        }

        let resp = self
            .client
            .get("https://api.zenrows.com/v1/")
            .headers(headers)
            .query(&params)
            .send()?;

        let status = resp.status();
        let original_status = resp
            .headers()
            .iter()
            .find(|(k, _)| k.as_str().to_ascii_lowercase().contains("original"))
            .and_then(|(_, v)| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string();

        let text = resp.text()?;

        if !status.is_success() {
            warn!(url, %status, %original_status, "ZenRows request failed");
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // ZenRows reports API-level failures as a JSON body with a `code` field.
        if text.starts_with('{') {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
                if json.get("code").is_some() {
                    return Err(ScraperError::Network(format!(
                        "ZenRows API error ({original_status}): {text}"
                    )));
                }
            }
        }

        info!(url, elapsed = ?start.elapsed(), "Successfully scraped page");
        checked_body(url, text)
    }
}

pub fn fetcher_from_settings(settings: &Settings) -> Result<Box<dyn PageFetcher>, ScraperError> {
    match settings.scraper {
        ScraperKind::Direct => Ok(Box::new(DirectFetcher::new()?)),
        ScraperKind::ZenRows => {
            let api_key = settings.zenrows_api_key.clone().ok_or_else(|| {
                ScraperError::Config("ZENROWS_API_KEY environment variable not set".into())
            })?;
            Ok(Box::new(ZenRowsFetcher::new(api_key)?))
        }
    }
}
