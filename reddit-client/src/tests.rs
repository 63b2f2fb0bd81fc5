#[cfg(test)]
mod tests {
    use crate::{ContentExtractor, Discovery, DiscoveryPage, ExhaustionReason, Permalink};
    use serde_json::json;
    use threadsense_core::testing::ScriptedTransport;
    use threadsense_core::{FetchRequest, ParseError, TrackedField, Transport};

    const BASE: &str = "https://www.reddit.com";

    fn listing_page() -> String {
        concat!(
            "<div class=\"thing\" data-inbound-url=\"/r/rust/comments/t1/first/\" data-rank=\"1\"></div>",
            "<div class=\"thing\" data-inbound-url=\"/r/golang/comments/t2/second/\" data-rank=\"2\"></div>"
        )
        .to_string()
    }

    fn thread(id: &str, title: &str, comment: &str) -> String {
        json!([
            {"kind": "Listing", "data": {"children": [
                {"kind": "t3", "data": {
                    "id": id, "permalink": format!("/r/x/comments/{id}/slug/"),
                    "score": 7, "ups": 8, "downs": 1, "author": "op",
                    "created_utc": 1640995200.0, "title": title, "selftext": ""
                }}
            ]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {
                    "id": format!("{id}_c"), "permalink": format!("/r/x/comments/{id}/slug/{id}_c/"),
                    "score": 1, "ups": 1, "downs": 0, "author": "replier",
                    "created_utc": 1640995300.0, "body": comment
                }}
            ]}}
        ])
        .to_string()
    }

    #[test]
    fn test_permalink_parse_contract() {
        let valid = Permalink::parse("/r/rust/comments/t1/first/").unwrap();
        assert_eq!(
            (valid.id.as_str(), valid.community.as_str(), valid.slug.as_str()),
            ("t1", "rust", "first")
        );

        let invalid = Permalink::parse("/r/rust/comments/t1");
        assert!(matches!(
            invalid,
            Err(ParseError::InvalidPermalink { segments: 5, .. })
        ));
    }

    #[test]
    fn test_discover_then_extract() {
        let transport = ScriptedTransport::new()
            .respond(format!("{BASE}/r/all/new/"), listing_page())
            .respond(
                format!("{BASE}/r/rust/comments/t1.json"),
                thread("t1", "Rust is fun", "agreed"),
            )
            .respond(
                format!("{BASE}/r/golang/comments/t2.json"),
                thread("t2", "Go is fun", "but have you tried rust"),
            );
        let extractor = ContentExtractor::from_keywords(&["rust"]);
        let mut discovery = Discovery::new(BASE, None);

        let page = tokio_test::block_on(discovery.next_page(&transport));
        let DiscoveryPage::Candidates(candidates) = page else {
            panic!("expected a page of candidates");
        };
        assert_eq!(discovery.cursor(), Some("t3_t2"));

        let mut records = Vec::new();
        for permalink in &candidates {
            let request = FetchRequest::get(permalink.thread_json_url(BASE));
            let body = tokio_test::block_on(transport.fetch(request))
                .into_body()
                .unwrap();
            records.extend(extractor.extract_thread(&body, permalink).unwrap());
        }

        let summary: Vec<(&str, Vec<TrackedField>)> = records
            .iter()
            .map(|r| (r.id.as_str(), r.matched_fields.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("t1", vec![TrackedField::Title]),
                ("t2_c", vec![TrackedField::Body]),
            ]
        );
        assert_eq!(records[1].community, "golang");
    }

    #[test]
    fn test_listing_failure_after_first_page() {
        let transport = ScriptedTransport::new()
            .respond(format!("{BASE}/r/all/new/"), listing_page())
            .fail(format!("{BASE}/r/all/new/?count=25&after=t3_t2"));
        let mut discovery = Discovery::new(BASE, None);

        assert!(matches!(
            tokio_test::block_on(discovery.next_page(&transport)),
            DiscoveryPage::Candidates(_)
        ));
        assert_eq!(
            tokio_test::block_on(discovery.next_page(&transport)),
            DiscoveryPage::Exhausted(ExhaustionReason::TransportFailure)
        );
        assert_eq!(transport.call_count(), 2);
    }
}
