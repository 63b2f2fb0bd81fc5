use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Body template value that stands for "the text of the field being analyzed".
pub const FIELD_TEXT_PLACEHOLDER: &str = "data_string";

/// Text attributes of a listing item that are eligible for keyword matching
/// and analysis. Declaration order is the order fields are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedField {
    Title,
    Body,
    Selftext,
}

impl TrackedField {
    pub const ALL: [TrackedField; 3] = [TrackedField::Title, TrackedField::Body, TrackedField::Selftext];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Title => "title",
            TrackedField::Body => "body",
            TrackedField::Selftext => "selftext",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub api_name: String,
    pub field: TrackedField,
    /// Parsed JSON response, or the raw body as a string when it is not JSON.
    pub payload: Value,
}

impl AnalysisResult {
    pub fn from_response(api_name: &str, field: TrackedField, body: &str) -> Self {
        let payload =
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
        Self {
            api_name: api_name.to_string(),
            field,
            payload,
        }
    }
}

/// A listing item that matched at least one keyword in at least one tracked field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub id: String,
    pub permalink: String,
    pub community: String,
    pub matched_fields: Vec<TrackedField>,
    pub field_values: BTreeMap<TrackedField, String>,
    pub score: i64,
    pub ups: i64,
    pub downs: i64,
    pub author: String,
    pub created_utc: f64,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub analyses: Vec<AnalysisResult>,
}

impl ExtractedRecord {
    pub fn field_text(&self, field: TrackedField) -> Option<&str> {
        self.field_values.get(&field).map(String::as_str)
    }

    pub fn append_analyses(&mut self, results: Vec<AnalysisResult>) {
        self.analyses.extend(results);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// How a POST body template is put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    #[default]
    Form,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub json_data: Map<String, Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body_encoding: BodyEncoding,
}

impl ApiConfig {
    /// Copy of the body template with every placeholder value replaced by `text`.
    pub fn render_body(&self, text: &str) -> Map<String, Value> {
        self.json_data
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) if s == FIELD_TEXT_PLACEHOLDER => Value::String(text.to_string()),
                    other => other.clone(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}
