// src/pipeline/runner.rs

use std::fmt;
use std::time::Duration;

use chrono::Local;
use tracing::{error, info, warn};
use url::Url;

use super::PipelineContext;
use crate::agents::retrieve_listings;
use crate::domain::{notes, ErrorRow, ListingRecord, RawListing};
use crate::scraper::html::{collect_same_origin_links, page_text, resolve_link};
use crate::scraper::PageContent;
use crate::store::Sink;

/// The fallible steps of one site run. Text conversion cannot fail and has
/// no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InitialFetch,
    CollectLinks,
    SelectLink,
    RoomFetch,
    ExtractListings,
    BuildRecords,
    Persist,
}

impl Stage {
    pub fn failure_note(self) -> &'static str {
        match self {
            Stage::InitialFetch => notes::INITIAL_PAGE_SCRAPING_FAILED,
            Stage::CollectLinks => notes::NO_UNIQUE_URLS_FOUND,
            Stage::SelectLink => notes::ROOM_LINK_RETRIEVAL_FAILED,
            Stage::RoomFetch => notes::ROOM_PAGE_SCRAPING_FAILED,
            Stage::ExtractListings => notes::ROOM_DETAILS_RETRIEVAL_FAILED,
            Stage::BuildRecords => notes::DATA_PROCESSING_FAILED,
            Stage::Persist => notes::PROCESSED_DATA_SAVING_FAILED,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::InitialFetch => "initial fetch",
            Stage::CollectLinks => "link collection",
            Stage::SelectLink => "link selection",
            Stage::RoomFetch => "room page fetch",
            Stage::ExtractListings => "listing extraction",
            Stage::BuildRecords => "record building",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Why a run stopped. `url` is the page the error row is filed under.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub stage: Stage,
    pub url: String,
    pub detail: String,
}

impl StageFailure {
    pub(crate) fn new(stage: Stage, url: &str, detail: impl fmt::Display) -> Self {
        Self {
            stage,
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn note(&self) -> &'static str {
        self.stage.failure_note()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteOutcome {
    Saved { room_url: String, records: usize },
    Failed { stage: Stage, url: String, note: String },
}

impl SiteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SiteOutcome::Saved { .. })
    }
}

/// The listing index of a site, fetched.
#[derive(Debug, Clone)]
pub struct RoomPage {
    pub url: String,
    pub page: PageContent,
}

/// Runs the stages for one site against a shared context.
pub struct SitePipeline<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> SitePipeline<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Full run for `base_url`. Exactly one row is written: the saved
    /// listings on success, an error row otherwise.
    pub fn run(&self, base_url: &str) -> SiteOutcome {
        info!(base_url, "Starting site pipeline");

        let result = self
            .locate_room_page(base_url, self.ctx.options.waiting_time)
            .and_then(|room| {
                let records = self.process_room_page(&room.url, &room.page)?;
                Ok((room.url, records))
            });

        match result {
            Ok((room_url, records)) => {
                info!(base_url, room_url = %room_url, records, "Site pipeline finished");
                SiteOutcome::Saved { room_url, records }
            }
            Err(failure) => self.record_failure(&failure),
        }
    }

    /// Stages 1 to 4: base page, links, listing index choice, listing page.
    pub fn locate_room_page(
        &self,
        base_url: &str,
        wait: Duration,
    ) -> Result<RoomPage, StageFailure> {
        let base_page = self.fetch(base_url, wait, Stage::InitialFetch, base_url)?;

        let candidates = collect_same_origin_links(&base_page, base_url)
            .map_err(|e| StageFailure::new(Stage::CollectLinks, base_url, e))?;
        if candidates.is_empty() {
            return Err(StageFailure::new(
                Stage::CollectLinks,
                base_url,
                "page has no same-origin links",
            ));
        }

        let answer = self
            .ctx
            .link_selector
            .select_listing_index_url(&candidates)
            .map_err(|e| StageFailure::new(Stage::SelectLink, base_url, e))?
            .ok_or_else(|| StageFailure::new(Stage::SelectLink, base_url, "no suitable URL"))?;

        let base = Url::parse(base_url)
            .map_err(|e| StageFailure::new(Stage::SelectLink, base_url, e))?;
        let room_url = resolve_link(&base, &answer)
            .map(|url| url.to_string())
            .filter(|url| candidates.contains(url))
            .ok_or_else(|| {
                StageFailure::new(
                    Stage::SelectLink,
                    base_url,
                    format!("selected `{answer}` is not one of the page's links"),
                )
            })?;
        info!(base_url, room_url = %room_url, "Room link retrieved");

        let page = self.fetch(&room_url, wait, Stage::RoomFetch, base_url)?;
        Ok(RoomPage { url: room_url, page })
    }

    /// Stages 5 to 8 over an already fetched listing page. Records are keyed
    /// by `key_url`. Returns the number of rows written.
    pub fn process_room_page(
        &self,
        key_url: &str,
        page: &PageContent,
    ) -> Result<usize, StageFailure> {
        let records = self.extract_records(key_url, page)?;
        self.persist(&records, key_url)
    }

    /// Stages 5 to 7: text, listings, records.
    pub fn extract_records(
        &self,
        key_url: &str,
        page: &PageContent,
    ) -> Result<Vec<ListingRecord>, StageFailure> {
        let text = page_text(page);

        let extractor = self.ctx.extractor.as_deref().ok_or_else(|| {
            StageFailure::new(Stage::ExtractListings, key_url, "no listing extractor configured")
        })?;
        let listings = retrieve_listings(extractor, &text, self.ctx.options.max_words);
        if listings.is_empty() {
            return Err(StageFailure::new(
                Stage::ExtractListings,
                key_url,
                "no listings found in page text",
            ));
        }

        let records = self.build_records(&listings, key_url);
        if records.is_empty() {
            return Err(StageFailure::new(
                Stage::BuildRecords,
                key_url,
                format!("none of {} listings had a name or address", listings.len()),
            ));
        }
        Ok(records)
    }

    fn build_records(&self, listings: &[RawListing], key_url: &str) -> Vec<ListingRecord> {
        let now = Local::now().naive_local();
        let geocoder = self
            .ctx
            .geocoder
            .as_deref()
            .filter(|_| self.ctx.options.inline_geocoding);

        listings
            .iter()
            .filter_map(|raw| {
                let mut record = ListingRecord::from_raw(raw, key_url, now)?;
                if let (Some(geocoder), Some(address)) = (geocoder, raw.address.as_deref()) {
                    match geocoder.geocode(address) {
                        Ok(Some(found)) => record.apply_address(&found),
                        Ok(None) => warn!(address, "No location found"),
                        Err(e) => warn!(address, error = %e, "Geocoding failed"),
                    }
                }
                Some(record)
            })
            .collect()
    }

    /// Stage 8: success-sink write, tried up to `save_attempts` times.
    pub fn persist(&self, records: &[ListingRecord], key_url: &str) -> Result<usize, StageFailure> {
        let records: Vec<ListingRecord> = records
            .iter()
            .cloned()
            .map(|r| r.with_note(notes::DATA_PROCESSED))
            .collect();

        let attempts = self.ctx.options.save_attempts.max(1);
        for attempt in 1..=attempts {
            if self.ctx.store.save(&records, Sink::Success) {
                return Ok(records.len());
            }
            warn!(key_url, attempt, attempts, "Saving processed data failed");
        }

        Err(StageFailure::new(
            Stage::Persist,
            key_url,
            format!("{attempts} save attempts failed"),
        ))
    }

    /// Files `failure` in the error sink and turns it into an outcome.
    pub fn record_failure(&self, failure: &StageFailure) -> SiteOutcome {
        let note = failure.note();
        error!(
            stage = %failure.stage,
            url = %failure.url,
            detail = %failure.detail,
            "{note}"
        );
        self.ctx.store.save_error(ErrorRow::new(&failure.url, note));

        SiteOutcome::Failed {
            stage: failure.stage,
            url: failure.url.clone(),
            note: note.to_string(),
        }
    }

    /// Fetch with the failure filed under `error_url`.
    pub fn fetch(
        &self,
        url: &str,
        wait: Duration,
        stage: Stage,
        error_url: &str,
    ) -> Result<PageContent, StageFailure> {
        self.ctx
            .fetcher
            .fetch_rendered_page(url, wait)
            .map_err(|e| StageFailure::new(stage, error_url, e))
    }
}
