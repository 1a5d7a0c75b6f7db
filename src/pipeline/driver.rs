// src/pipeline/driver.rs

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, info};

use super::{PipelineContext, SitePipeline};
use crate::domain::ErrorRow;
use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn build_pool(workers: usize) -> Result<ThreadPool, PipelineError> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("site-worker-{i}"))
        .build()?)
}

/// Runs the site pipeline for every URL on a pool of `workers` threads. A
/// panicking run is caught and filed as an error row for that site.
pub fn process_websites(
    ctx: &PipelineContext,
    websites: &[String],
    workers: usize,
) -> Result<RunSummary, PipelineError> {
    let pool = build_pool(workers)?;
    info!(sites = websites.len(), workers, "Processing websites");

    let outcomes: Vec<bool> = pool.install(|| {
        websites
            .par_iter()
            .map(|url| run_guarded(ctx, url))
            .collect()
    });

    let succeeded = outcomes.iter().filter(|ok| **ok).count();
    let summary = RunSummary {
        total: outcomes.len(),
        succeeded,
        failed: outcomes.len() - succeeded,
    };
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Finished processing websites"
    );
    Ok(summary)
}

fn run_guarded(ctx: &PipelineContext, url: &str) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| SitePipeline::new(ctx).run(url))) {
        Ok(outcome) => outcome.is_success(),
        Err(payload) => {
            let note = format!(
                "Pipeline for {url} generated an exception: {}",
                panic_message(payload.as_ref())
            );
            error!(url, "{note}");
            ctx.store.save_error(ErrorRow::new(url, note));
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
