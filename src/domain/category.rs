// src/domain/category.rs

use std::fmt;

use super::notes;

/// Retry bucket for a persisted note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ScrapingError,
    UrlError,
    DataError,
    SaveError,
    Success,
    UnknownError,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::ScrapingError => "scraping_error",
            ErrorCategory::UrlError => "url_error",
            ErrorCategory::DataError => "data_error",
            ErrorCategory::SaveError => "save_error",
            ErrorCategory::Success => "success",
            ErrorCategory::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known phrases per category. The order of the table is the precedence:
/// a note mentioning both a scraping and a data failure is a scraping error.
pub const CATEGORY_PHRASES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::ScrapingError,
        &[
            notes::INITIAL_PAGE_SCRAPING_FAILED,
            notes::ROOM_PAGE_SCRAPING_FAILED,
        ],
    ),
    (
        ErrorCategory::UrlError,
        &[notes::NO_UNIQUE_URLS_FOUND, notes::ROOM_LINK_RETRIEVAL_FAILED],
    ),
    (
        ErrorCategory::DataError,
        &[
            notes::ROOM_DETAILS_RETRIEVAL_FAILED,
            notes::ROOM_DETAILS_UNEXPECTED_FORMAT,
            notes::DATA_PROCESSING_FAILED,
        ],
    ),
    (
        ErrorCategory::SaveError,
        &[notes::PROCESSED_DATA_SAVING_FAILED],
    ),
    (
        ErrorCategory::Success,
        &[
            notes::ROOM_LINK_RETRIEVED,
            notes::ROOM_DETAILS_RETRIEVED,
            notes::DATA_PROCESSED,
        ],
    ),
];

/// Maps a free-text note onto its category by case-insensitive substring match.
pub fn classify(note: &str) -> ErrorCategory {
    let note = note.to_lowercase();

    CATEGORY_PHRASES
        .iter()
        .find(|(_, phrases)| {
            phrases
                .iter()
                .any(|phrase| note.contains(&phrase.to_lowercase()))
        })
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::UnknownError)
}
