use serde::{Deserialize, Serialize};
use serde_json::Value;
use threadsense_core::{ParseError, TrackedField};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// The part of a post or comment the extractor cares about. Metadata fields
/// are required; tracked text fields are optional because posts carry
/// `title`/`selftext` while comments carry `body`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditThingData {
    pub id: String,
    pub permalink: String,
    pub score: i64,
    pub ups: i64,
    pub downs: i64,
    pub author: String,
    pub created_utc: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub selftext: Option<String>,
}

/// Metadata every kept item must carry. `more` stubs carry none of them.
const REQUIRED_FIELDS: [&str; 7] = ["id", "permalink", "score", "ups", "downs", "author", "created_utc"];

impl RedditThingData {
    /// Decodes one listing child's `data` object.
    pub fn from_child(data: Value) -> Result<Self, ParseError> {
        if let Some(field) = REQUIRED_FIELDS
            .iter()
            .find(|field| data.get(**field).map_or(true, Value::is_null))
        {
            return Err(ParseError::MissingField {
                field: field.to_string(),
            });
        }
        serde_json::from_value(data).map_err(|e| ParseError::MalformedListing {
            details: e.to_string(),
        })
    }

    pub fn field(&self, field: TrackedField) -> Option<&str> {
        match field {
            TrackedField::Title => self.title.as_deref(),
            TrackedField::Body => self.body.as_deref(),
            TrackedField::Selftext => self.selftext.as_deref(),
        }
    }
}

/// Parses a thread's `.json` response: an array of listings, the post
/// listing first and the comment listing second.
pub fn parse_thread(body: &str) -> Result<Vec<RedditListing<Value>>, ParseError> {
    serde_json::from_str(body).map_err(|e| ParseError::MalformedListing {
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_thread_with_post_and_comments() {
        let body = json!([
            {"kind": "Listing", "data": {"children": [
                {"kind": "t3", "data": {"id": "abc", "title": "Hello"}}
            ], "after": null}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"id": "c1", "body": "reply"}},
                {"kind": "more", "data": {"count": 4, "children": ["c2"]}}
            ]}}
        ])
        .to_string();

        let listings = parse_thread(&body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].data.children[0].kind, "t3");
        assert_eq!(listings[1].data.children.len(), 2);
        assert!(listings[1].data.after.is_none());
    }

    #[test]
    fn test_parse_thread_rejects_non_array() {
        let result = parse_thread(r#"{"error": 404}"#);
        assert!(matches!(result, Err(ParseError::MalformedListing { .. })));

        let result = parse_thread("<html>blocked</html>");
        assert!(matches!(result, Err(ParseError::MalformedListing { .. })));
    }

    #[test]
    fn test_from_child_reports_missing_and_malformed_fields() {
        let stub = RedditThingData::from_child(json!({"count": 4, "children": ["c2"]}));
        assert_eq!(
            stub.unwrap_err(),
            ParseError::MissingField {
                field: "id".to_string()
            }
        );

        let no_author = RedditThingData::from_child(json!({
            "id": "c1", "permalink": "/r/rust/comments/abc/slug/c1/",
            "score": 1, "ups": 1, "downs": 0, "author": null, "created_utc": 1640995200.0
        }));
        assert!(matches!(no_author, Err(ParseError::MissingField { ref field }) if field == "author"));

        let bad_score = RedditThingData::from_child(json!({
            "id": "c1", "permalink": "/r/rust/comments/abc/slug/c1/",
            "score": "many", "ups": 1, "downs": 0, "author": "ferris", "created_utc": 1640995200.0
        }));
        assert!(matches!(bad_score, Err(ParseError::MalformedListing { .. })));
    }

    #[test]
    fn test_thing_data_fields() {
        let thing: RedditThingData = serde_json::from_value(json!({
            "id": "c1", "permalink": "/r/rust/comments/abc/slug/c1/",
            "score": 3, "ups": 3, "downs": 0, "author": "ferris",
            "created_utc": 1640995200.0, "body": "tokio rocks", "title": null
        }))
        .unwrap();

        assert_eq!(thing.field(TrackedField::Body), Some("tokio rocks"));
        assert_eq!(thing.field(TrackedField::Title), None);
        assert_eq!(thing.field(TrackedField::Selftext), None);
    }
}
