mod fetcher;
pub mod html;
mod models;
mod scraper_error;

pub use fetcher::{fetcher_from_settings, PageFetcher};
pub use models::PageContent;
pub use scraper_error::ScraperError;
