//! HTML helpers over fetched pages: link collection, text extraction and
//! iframe discovery.

use std::collections::BTreeSet;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::{PageContent, ScraperError};

/// Subtrees that never hold listing text.
const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "input", "textarea", "iframe", "noscript", "svg", "img", "br",
];

/// Elements that start a new line in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "tbody", "td", "th", "thead", "tr", "ul",
];

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::HtmlParse(e.to_string()))
}

fn parse_url(raw: &str) -> Result<Url, ScraperError> {
    Url::parse(raw).map_err(|e| ScraperError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves `href` against `base`, dropping the fragment. Only http(s) targets
/// survive, so `mailto:`, `tel:` and `javascript:` links fall out here.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

/// Every `<a href>` on the page that stays on the origin of `base_url`,
/// resolved to an absolute URL. Sorted and deduplicated.
pub fn collect_same_origin_links(
    page: &PageContent,
    base_url: &str,
) -> Result<BTreeSet<String>, ScraperError> {
    info!(base_url, "Initiated collecting urls");
    let base = parse_url(base_url)?;
    let origin = base.origin();

    let document = Html::parse_document(&page.html);
    let anchors = selector("a[href]")?;

    let mut total = 0usize;
    let mut unique = BTreeSet::new();
    for anchor in document.select(&anchors) {
        total += 1;
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if let Some(url) = resolve_link(&base, href) {
            if url.origin() == origin {
                unique.insert(url.to_string());
            }
        }
    }

    info!(unique = unique.len(), total, "Collected urls");
    debug!(urls = ?unique, "Unique urls");
    Ok(unique)
}

/// The `src` of the first `<iframe>`, resolved against the page URL.
pub fn first_iframe_src(page: &PageContent) -> Result<Option<String>, ScraperError> {
    let base = parse_url(&page.url)?;
    let document = Html::parse_document(&page.html);
    let iframes = selector("iframe[src]")?;

    let src = document
        .select(&iframes)
        .filter_map(|frame| frame.value().attr("src"))
        .find_map(|src| resolve_link(&base, src))
        .map(|url| url.to_string());

    match &src {
        Some(src) => info!(%src, "Found iframe"),
        None => debug!(url = %page.url, "No iframe with a usable src"),
    }
    Ok(src)
}

/// Visible text of the page: non-content subtrees are skipped, every line is
/// trimmed with inner whitespace collapsed, blank lines are dropped.
pub fn page_text(page: &PageContent) -> String {
    let document = Html::parse_document(&page.html);
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    normalize_text(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }

        let Some(child_element) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child_element.value().name();
        if SKIPPED_TAGS.contains(&name) {
            if name == "br" {
                out.push('\n');
            }
            continue;
        }

        let block = BLOCK_TAGS.contains(&name);
        if block {
            out.push('\n');
        }
        collect_text(child_element, out);
        if block {
            out.push('\n');
        }
    }
}

pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
