// src/domain/notes.rs

//! Outcome notes written to the `Note` column.
//!
//! The retry command re-derives its strategy from these strings, so the wording
//! is part of the file format.

pub const INITIAL_PAGE_SCRAPING_FAILED: &str = "Initial page scraping failed";
pub const NO_UNIQUE_URLS_FOUND: &str = "No unique URLs found";
pub const ROOM_LINK_RETRIEVAL_FAILED: &str = "Room link retrieval failed";
pub const ROOM_PAGE_SCRAPING_FAILED: &str = "Room page scraping failed";
pub const ROOM_DETAILS_RETRIEVAL_FAILED: &str = "Room details retrieval failed";
pub const ROOM_DETAILS_UNEXPECTED_FORMAT: &str = "Room details in unexpected format";
pub const DATA_PROCESSING_FAILED: &str = "Data processing failed";
pub const PROCESSED_DATA_SAVING_FAILED: &str = "Processed data saving failed";

pub const ROOM_LINK_RETRIEVED: &str = "Room link retrieved successfully";
pub const ROOM_DETAILS_RETRIEVED: &str = "Room details retrieved successfully";
pub const DATA_PROCESSED: &str = "Data processed successfully";

/// Appended to a note when an upsert overwrites an existing row.
pub const UPDATED_SUFFIX: &str = " (updated)";

pub fn all_retries_failed(last_note: &str) -> String {
    format!("All retries failed (last: {last_note})")
}

pub fn unknown_category(category: &str) -> String {
    format!("Unknown error category: {category}")
}
