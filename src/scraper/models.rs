/// A fetched page: the URL it was requested with and its final HTML.
///
/// Kept as text rather than a parsed tree so it can move between worker threads;
/// the helpers in [`super::html`] parse on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub url: String,
    pub html: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}
