//! Pages through the whole-platform "new" listing and turns each page into
//! an ordered batch of thread permalinks.

use crate::permalink::Permalink;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use threadsense_core::{ErrorExt, FetchRequest, Transport};
use tracing::{debug, info, warn};

/// Page size the listing endpoint is asked to count past with `after`.
pub const LISTING_PAGE_SIZE: u32 = 25;

fn inbound_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)data-inbound-url="(.*?)" "#).expect("inbound url pattern is valid")
    })
}

/// Every `data-inbound-url` attribute value in a listing page, in page order.
pub fn extract_inbound_urls(page: &str) -> Vec<String> {
    inbound_url_pattern()
        .captures_iter(page)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionReason {
    TransportFailure,
    NoCandidates,
    NoValidCandidates,
    CursorStalled,
    PageLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryPage {
    Candidates(Vec<Permalink>),
    Exhausted(ExhaustionReason),
}

#[derive(Debug)]
pub struct Discovery {
    base_url: String,
    cursor: Option<String>,
    pages_fetched: u32,
    max_pages: Option<u32>,
}

impl Discovery {
    pub fn new(base_url: impl Into<String>, max_pages: Option<u32>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cursor: None,
            pages_fetched: 0,
            max_pages,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn listing_url(&self) -> String {
        match &self.cursor {
            None => format!("{}/r/all/new/", self.base_url),
            Some(after) => format!(
                "{}/r/all/new/?count={}&after={}",
                self.base_url, LISTING_PAGE_SIZE, after
            ),
        }
    }

    /// Fetches the next listing page. The cursor moves to the fullname of
    /// the page's last valid permalink; a page that would not move it
    /// reports exhaustion instead of repeating itself.
    pub async fn next_page<T: Transport + ?Sized>(&mut self, transport: &T) -> DiscoveryPage {
        if self.max_pages.is_some_and(|max| self.pages_fetched >= max) {
            info!(pages = self.pages_fetched, "Listing page limit reached");
            return DiscoveryPage::Exhausted(ExhaustionReason::PageLimit);
        }

        let url = self.listing_url();
        debug!(url = %url, "Fetching listing page");
        let page = match transport.fetch(FetchRequest::get(&url)).await.into_body() {
            Some(page) => page,
            None => {
                info!(url = %url, "Listing fetch failed, out of data");
                return DiscoveryPage::Exhausted(ExhaustionReason::TransportFailure);
            }
        };
        self.pages_fetched += 1;

        let urls = extract_inbound_urls(&page);
        if urls.is_empty() {
            info!(url = %url, "Listing page has no threads, out of data");
            return DiscoveryPage::Exhausted(ExhaustionReason::NoCandidates);
        }

        let mut seen = HashSet::new();
        let candidates: Vec<Permalink> = urls
            .iter()
            .filter_map(|raw| match Permalink::parse_on_site(raw, &self.base_url) {
                Ok(permalink) => Some(permalink),
                Err(e) => {
                    e.log_warn();
                    None
                }
            })
            .filter(|permalink| seen.insert(permalink.id.clone()))
            .collect();

        let Some(last) = candidates.last() else {
            warn!(url = %url, found = urls.len(), "No valid thread permalinks on listing page");
            return DiscoveryPage::Exhausted(ExhaustionReason::NoValidCandidates);
        };

        let next_cursor = last.fullname();
        if self.cursor.as_deref() == Some(next_cursor.as_str()) {
            warn!(cursor = %next_cursor, "Listing cursor did not advance");
            return DiscoveryPage::Exhausted(ExhaustionReason::CursorStalled);
        }

        info!(
            page = self.pages_fetched,
            candidates = candidates.len(),
            cursor = %next_cursor,
            "Discovered threads"
        );
        self.cursor = Some(next_cursor);
        DiscoveryPage::Candidates(candidates)
    }
}
