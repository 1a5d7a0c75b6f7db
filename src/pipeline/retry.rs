// src/pipeline/retry.rs

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{error, info, warn};

use super::driver::{build_pool, panic_message};
use super::{PipelineContext, SitePipeline, Stage, StageFailure};
use crate::config::Settings;
use crate::domain::{classify, notes, ErrorCategory, ErrorRow, ListingRecord};
use crate::errors::PipelineError;
use crate::scraper::html::first_iframe_src;
use crate::store::{load_error_rows, Sink};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Render wait for scraping and URL retries.
    pub wait_time: Duration,
    /// Render wait for data retries.
    pub data_wait_time: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            wait_time: Duration::from_secs(15),
            data_wait_time: Duration::from_secs(10),
        }
    }
}

impl From<&Settings> for RetryPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.retry_max_attempts,
            wait_time: settings.retry_wait_time,
            data_wait_time: settings.retry_data_wait_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryResult {
    pub url: String,
    pub note: String,
    pub success: bool,
}

impl RetryResult {
    fn new(url: &str, note: impl Into<String>, success: bool) -> Self {
        Self {
            url: url.to_string(),
            note: note.into(),
            success,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryReport {
    pub results: Vec<RetryResult>,
    pub succeeded: usize,
    pub total: usize,
}

/// Retries every row of `errors_path`, one task per row on a pool of
/// `workers` threads.
pub fn retry_errors(
    ctx: &PipelineContext,
    errors_path: &Path,
    policy: &RetryPolicy,
    workers: usize,
) -> Result<RetryReport, PipelineError> {
    let rows = load_error_rows(errors_path)?;
    info!(path = %errors_path.display(), rows = rows.len(), "Retrying failed rows");

    let pool = build_pool(workers)?;
    let results: Vec<RetryResult> = pool.install(|| {
        rows.par_iter()
            .map(|row| retry_guarded(ctx, row, policy))
            .collect()
    });

    let succeeded = results.iter().filter(|r| r.success).count();
    info!(succeeded, total = results.len(), "Retry process finished");
    Ok(RetryReport {
        total: results.len(),
        succeeded,
        results,
    })
}

fn retry_guarded(ctx: &PipelineContext, row: &ErrorRow, policy: &RetryPolicy) -> RetryResult {
    match panic::catch_unwind(AssertUnwindSafe(|| process_row(ctx, row, policy))) {
        Ok(result) => result,
        Err(payload) => {
            let url = &row.url_scrapped;
            let note = format!(
                "Retry for {url} generated an exception: {}",
                panic_message(payload.as_ref())
            );
            error!(url = %url, "{note}");
            ctx.store.save_error(ErrorRow::new(url, &note));
            RetryResult::new(url, note, false)
        }
    }
}

/// Re-runs the part of the pipeline the row's note points at.
pub fn process_row(ctx: &PipelineContext, row: &ErrorRow, policy: &RetryPolicy) -> RetryResult {
    let url = row.url_scrapped.as_str();
    let category = classify(&row.note);
    info!(url, %category, note = %row.note, "Processing error row");

    let pipeline = SitePipeline::new(ctx);
    match category {
        ErrorCategory::ScrapingError | ErrorCategory::UrlError => {
            with_attempts(ctx, url, category, policy.max_attempts, || {
                retry_link(ctx, &pipeline, url, policy.wait_time)
            })
        }
        ErrorCategory::DataError => {
            with_attempts(ctx, url, category, policy.max_attempts, || {
                retry_data(&pipeline, url, policy.data_wait_time)
            })
        }
        ErrorCategory::SaveError => {
            // Nothing is re-fetched; the row is written again and stays failed.
            let note = notes::PROCESSED_DATA_SAVING_FAILED;
            warn!(url, "Save errors are not re-processed");
            ctx.store.save_error(ErrorRow::new(url, note));
            RetryResult::new(url, note, false)
        }
        ErrorCategory::UnknownError | ErrorCategory::Success => {
            let note = notes::unknown_category(category.as_str());
            warn!(url, "{note}");
            ctx.store.save_error(ErrorRow::new(url, &note));
            RetryResult::new(url, note, false)
        }
    }
}

/// Note for the last failed attempt of a retry routed by `category`. A failure
/// that classifies under another retry path is replaced by the category's own
/// note; the row keeps its path on the next run.
fn terminal_note(category: ErrorCategory, failure: &StageFailure) -> &'static str {
    let note = failure.note();
    if same_retry_path(category, classify(note)) {
        return note;
    }
    match category {
        ErrorCategory::DataError => notes::ROOM_DETAILS_RETRIEVAL_FAILED,
        ErrorCategory::UrlError => notes::ROOM_LINK_RETRIEVAL_FAILED,
        _ => notes::INITIAL_PAGE_SCRAPING_FAILED,
    }
}

fn same_retry_path(a: ErrorCategory, b: ErrorCategory) -> bool {
    let link = |c: ErrorCategory| {
        matches!(c, ErrorCategory::ScrapingError | ErrorCategory::UrlError)
    };
    a == b || (link(a) && link(b))
}

fn with_attempts(
    ctx: &PipelineContext,
    url: &str,
    category: ErrorCategory,
    max_attempts: usize,
    mut attempt: impl FnMut() -> Result<&'static str, StageFailure>,
) -> RetryResult {
    let max_attempts = max_attempts.max(1);
    let mut last_note = "";

    for n in 1..=max_attempts {
        match attempt() {
            Ok(note) => {
                info!(url, attempt = n, "{note}");
                return RetryResult::new(url, note, true);
            }
            Err(failure) => {
                warn!(
                    url,
                    attempt = n,
                    max_attempts,
                    stage = %failure.stage,
                    detail = %failure.detail,
                    "Retry attempt failed"
                );
                last_note = terminal_note(category, &failure);
            }
        }
    }

    let note = notes::all_retries_failed(last_note);
    error!(url, "{note}");
    ctx.store.save_error(ErrorRow::new(url, &note));
    RetryResult::new(url, note, false)
}

/// Stages 1 to 4 again; a found listing index is recorded in the results file.
fn retry_link(
    ctx: &PipelineContext,
    pipeline: &SitePipeline<'_>,
    base_url: &str,
    wait: Duration,
) -> Result<&'static str, StageFailure> {
    let room = pipeline.locate_room_page(base_url, wait)?;

    let row = ListingRecord {
        url_scrapped: room.url.clone(),
        note: notes::ROOM_LINK_RETRIEVED.to_string(),
        ..Default::default()
    };
    if !ctx.store.save(&[row], Sink::Success) {
        return Err(StageFailure::new(
            Stage::Persist,
            base_url,
            "could not record the retrieved room link",
        ));
    }
    Ok(notes::ROOM_LINK_RETRIEVED)
}

/// Stages 4 to 8 against the row URL, going through an embedded iframe when
/// the page has one.
fn retry_data(
    pipeline: &SitePipeline<'_>,
    url: &str,
    wait: Duration,
) -> Result<&'static str, StageFailure> {
    let mut page = pipeline.fetch(url, wait, Stage::RoomFetch, url)?;

    match first_iframe_src(&page) {
        Ok(Some(src)) => {
            info!(url, iframe = %src, "Using iframe content");
            page = pipeline.fetch(&src, wait, Stage::RoomFetch, url)?;
        }
        Ok(None) => info!(url, "No iframe found, using page content"),
        Err(e) => warn!(url, error = %e, "Could not look for an iframe"),
    }

    pipeline.process_room_page(url, &page)?;
    Ok(notes::DATA_PROCESSED)
}
