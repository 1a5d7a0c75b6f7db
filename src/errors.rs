// errors.rs
use thiserror::Error;

use crate::agents::AgentError;
use crate::config::ConfigError;
use crate::geos::GeocodeError;
use crate::scraper::ScraperError;
use crate::store::StoreError;

/// Errors that stop a command before any site is processed. Per-site failures
/// never surface here; they become error rows.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
