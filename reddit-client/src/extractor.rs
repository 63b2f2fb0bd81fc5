//! Keyword filtering and projection of listing items into records.
//!
//! Every keyword is compiled as a case-insensitive regular expression. A
//! keyword that is not a valid pattern is matched as a literal instead, so
//! plain words and patterns can share one keyword file.

use crate::listing::{parse_thread, RedditListing, RedditThingData};
use crate::permalink::Permalink;
use chrono::Utc;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use threadsense_core::{ErrorExt, ExtractedRecord, ParseError, TrackedField};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    patterns: Vec<Regex>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let patterns = keywords
            .iter()
            .filter_map(|keyword| Self::compile(keyword.as_ref()))
            .collect();
        Self { patterns }
    }

    fn compile(keyword: &str) -> Option<Regex> {
        match RegexBuilder::new(keyword).case_insensitive(true).build() {
            Ok(pattern) => Some(pattern),
            Err(_) => {
                debug!("Keyword {:?} is not a valid pattern, matching it literally", keyword);
                RegexBuilder::new(&regex::escape(keyword))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| warn!("Dropping keyword {:?}: {}", keyword, e))
                    .ok()
            }
        }
    }

    /// Only non-empty matches count: a pattern such as `x?` matches the
    /// empty string everywhere and must not keep unrelated text.
    pub fn is_match(&self, text: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.find_iter(text).any(|m| !m.is_empty()))
    }
}

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    matcher: KeywordMatcher,
}

impl ContentExtractor {
    pub fn new(matcher: KeywordMatcher) -> Self {
        Self { matcher }
    }

    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self::new(KeywordMatcher::new(keywords))
    }

    /// Tracked fields of `item` that contain at least one keyword, in field order.
    pub fn matched_fields(&self, item: &RedditThingData) -> Vec<TrackedField> {
        TrackedField::ALL
            .into_iter()
            .filter(|field| item.field(*field).is_some_and(|text| self.matcher.is_match(text)))
            .collect()
    }

    /// Projects `item` into a record carrying only its matched fields, or
    /// `None` when no tracked field matches.
    pub fn extract_item(&self, item: RedditThingData, community: &str) -> Option<ExtractedRecord> {
        let matched_fields = self.matched_fields(&item);
        if matched_fields.is_empty() {
            return None;
        }

        let field_values: BTreeMap<TrackedField, String> = matched_fields
            .iter()
            .filter_map(|field| item.field(*field).map(|text| (*field, text.to_string())))
            .collect();

        Some(ExtractedRecord {
            id: item.id,
            permalink: item.permalink,
            community: community.to_string(),
            matched_fields,
            field_values,
            score: item.score,
            ups: item.ups,
            downs: item.downs,
            author: item.author,
            created_utc: item.created_utc,
            discovered_at: Utc::now(),
            analyses: Vec::new(),
        })
    }

    pub fn extract_listings(
        &self,
        listings: Vec<RedditListing<Value>>,
        community: &str,
    ) -> Vec<ExtractedRecord> {
        let mut records = Vec::new();
        for listing in listings {
            for child in listing.data.children {
                let item = match RedditThingData::from_child(child.data) {
                    Ok(item) => item,
                    Err(e) => {
                        debug!(kind = %child.kind, code = %e.error_code(), "Skipping listing child: {}", e);
                        continue;
                    }
                };
                if let Some(record) = self.extract_item(item, community) {
                    records.push(record);
                }
            }
        }
        records
    }

    /// Extracts every matching item from a thread's raw `.json` body.
    pub fn extract_thread(
        &self,
        body: &str,
        permalink: &Permalink,
    ) -> Result<Vec<ExtractedRecord>, ParseError> {
        let listings = parse_thread(body)?;
        let records = self.extract_listings(listings, &permalink.community);
        debug!(
            thread = %permalink.id,
            matched = records.len(),
            "Extracted records from thread"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thing(title: Option<&str>, body: Option<&str>, selftext: Option<&str>) -> RedditThingData {
        RedditThingData {
            id: "abc123".to_string(),
            permalink: "/r/rust/comments/abc123/slug/".to_string(),
            score: 10,
            ups: 12,
            downs: 2,
            author: "ferris".to_string(),
            created_utc: 1640995200.0,
            title: title.map(str::to_string),
            body: body.map(str::to_string),
            selftext: selftext.map(str::to_string),
        }
    }

    fn extractor(keywords: &[&str]) -> ContentExtractor {
        ContentExtractor::from_keywords(keywords)
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let matcher = KeywordMatcher::new(&["Rust"]);
        assert!(matcher.is_match("I love rust"));
        assert!(matcher.is_match("RUST!"));
        assert!(!matcher.is_match("I love go"));
    }

    #[test]
    fn test_pattern_keywords_and_literal_fallback() {
        let matcher = KeywordMatcher::new(&["tok(io|en)", "[wip"]);
        assert!(matcher.is_match("using tokio today"));
        assert!(matcher.is_match("a token"));
        assert!(matcher.is_match("a [WIP] change"));
        assert!(!matcher.is_match("wip"));
    }

    #[test]
    fn test_empty_matching_patterns_do_not_match_everything() {
        let matcher = KeywordMatcher::new(&["x?", "rust|"]);
        assert!(!matcher.is_match(""));
        assert!(!matcher.is_match("hello"));
        assert!(matcher.is_match("a box"));
        assert!(matcher.is_match("Rust"));

        let extractor = extractor(&["x?"]);
        assert!(extractor
            .extract_item(thing(Some("hello"), None, Some("")), "rust")
            .is_none());

        let record = extractor
            .extract_item(thing(Some("xylophone"), None, Some("")), "rust")
            .unwrap();
        assert_eq!(record.matched_fields, vec![TrackedField::Title]);
        assert_eq!(record.field_text(TrackedField::Selftext), None);
    }

    #[test]
    fn test_only_matched_fields_are_kept() {
        let extractor = extractor(&["rust"]);
        let record = extractor
            .extract_item(
                thing(Some("Rust 2024 is out"), Some("unrelated"), Some("more rust talk")),
                "rust",
            )
            .unwrap();

        assert_eq!(record.matched_fields, vec![TrackedField::Title, TrackedField::Selftext]);
        assert_eq!(record.field_values.len(), 2);
        assert_eq!(record.field_text(TrackedField::Title), Some("Rust 2024 is out"));
        assert_eq!(record.field_text(TrackedField::Body), None);
        assert_eq!(record.id, "abc123");
        assert_eq!(record.ups, 12);
        assert_eq!(record.downs, 2);
        assert_eq!(record.score, 10);
        assert_eq!(record.author, "ferris");
        assert_eq!(record.created_utc, 1640995200.0);
        assert!(record.analyses.is_empty());
    }

    #[test]
    fn test_item_without_match_is_dropped() {
        let extractor = extractor(&["rust", "cargo"]);
        assert!(extractor
            .extract_item(thing(Some("Go generics"), None, Some("")), "golang")
            .is_none());
    }

    #[test]
    fn test_retained_iff_some_field_matches() {
        let keyword_sets: [&[&str]; 4] = [&["rust"], &["tokio", "serde"], &["^exact$"], &["e?"]];
        let texts = [None, Some(""), Some("rust"), Some("serde and tokio"), Some("exact"), Some("inexact")];

        for keywords in keyword_sets {
            let extractor = extractor(keywords);
            let matcher = KeywordMatcher::new(keywords);
            for title in texts {
                for body in texts {
                    let item = thing(title, body, None);
                    let expected: Vec<TrackedField> = [(TrackedField::Title, title), (TrackedField::Body, body)]
                        .into_iter()
                        .filter(|(_, text)| text.is_some_and(|t| matcher.is_match(t)))
                        .map(|(field, _)| field)
                        .collect();

                    match extractor.extract_item(item, "rust") {
                        Some(record) => {
                            assert_eq!(record.matched_fields, expected);
                            let keys: Vec<TrackedField> = record.field_values.keys().copied().collect();
                            assert_eq!(keys, expected);
                        }
                        None => assert!(expected.is_empty()),
                    }
                }
            }
        }
    }

    #[test]
    fn test_extract_thread_skips_incomplete_children() {
        let body = json!([
            {"kind": "Listing", "data": {"children": [
                {"kind": "t3", "data": {
                    "id": "abc123", "permalink": "/r/rust/comments/abc123/slug/",
                    "score": 5, "ups": 5, "downs": 0, "author": "ferris",
                    "created_utc": 1640995200.0, "title": "Why rust?", "selftext": ""
                }}
            ]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {
                    "id": "c1", "permalink": "/r/rust/comments/abc123/slug/c1/",
                    "score": 1, "ups": 1, "downs": 0, "author": "crab",
                    "created_utc": 1640995300, "body": "because RUST"
                }},
                {"kind": "more", "data": {"count": 3, "children": ["c9"]}}
            ]}}
        ])
        .to_string();

        let permalink = Permalink::parse("/r/rust/comments/abc123/slug/").unwrap();
        let records = extractor(&["rust"]).extract_thread(&body, &permalink).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "abc123");
        assert_eq!(records[0].matched_fields, vec![TrackedField::Title]);
        assert_eq!(records[1].id, "c1");
        assert_eq!(records[1].matched_fields, vec![TrackedField::Body]);
        assert_eq!(records[1].community, "rust");
    }

    #[test]
    fn test_extract_thread_malformed_json() {
        let permalink = Permalink::parse("/r/rust/comments/abc123/slug/").unwrap();
        let result = extractor(&["rust"]).extract_thread("not json", &permalink);
        assert!(matches!(result, Err(ParseError::MalformedListing { .. })));
    }
}
