//! Single-request HTTP transport.
//!
//! Every failure (timeout, connection error, non-2xx status, unreadable body)
//! is logged here and collapsed into [`FetchOutcome::Failed`]. Callers test
//! the outcome, they never see an error type.

use crate::config::Settings;
use crate::error::CoreError;
use crate::types::{ApiConfig, BodyEncoding, HttpMethod};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:51.0) Gecko/20100101 Firefox/51.0";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    /// Sent as query parameters for GET, as the request body for POST.
    pub body: Option<Map<String, Value>>,
    pub encoding: BodyEncoding,
    pub headers: HashMap<String, String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            body: None,
            encoding: BodyEncoding::default(),
            headers: HashMap::new(),
        }
    }

    /// Request for one analysis API with `text` substituted into its body template.
    pub fn for_api(api: &ApiConfig, text: &str) -> Self {
        Self {
            url: api.url.clone(),
            method: api.method,
            body: Some(api.render_body(text)),
            encoding: api.body_encoding,
            headers: api.headers.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Body(String),
    /// The transport failure sentinel.
    Failed,
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed)
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            FetchOutcome::Body(body) => Some(body),
            FetchOutcome::Failed => None,
        }
    }

    pub fn into_body(self) -> Option<String> {
        match self {
            FetchOutcome::Body(body) => Some(body),
            FetchOutcome::Failed => None,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome;
}

/// Flattens a body template into string pairs for query strings and forms.
fn flatten_params(body: &Map<String, Value>) -> Vec<(String, String)> {
    body.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Default browser headers with the caller's headers layered on top.
fn merged_headers(extra: &HashMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));

    for (name, value) in extra {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Skipping invalid header {}", name),
        }
    }
    headers
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        Self::new(settings.request_timeout(), settings.accept_invalid_certs)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        let start_time = Instant::now();
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut request_builder = self
            .http_client
            .request(method, &request.url)
            .headers(merged_headers(&request.headers));

        if let Some(body) = &request.body {
            request_builder = match (request.method, request.encoding) {
                (HttpMethod::Get, _) => request_builder.query(&flatten_params(body)),
                (HttpMethod::Post, BodyEncoding::Form) => request_builder.form(&flatten_params(body)),
                (HttpMethod::Post, BodyEncoding::Json) => request_builder.json(body),
            };
        }

        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    url = %request.url,
                    method = %request.method,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    "Request error: {} (params: {:?})",
                    e,
                    request.body
                );
                return FetchOutcome::Failed;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                url = %request.url,
                method = %request.method,
                status = status.as_u16(),
                "Request failed with status {}",
                status
            );
            return FetchOutcome::Failed;
        }

        match response.text().await {
            Ok(body) => {
                debug!(
                    url = %request.url,
                    status = status.as_u16(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Request successful"
                );
                FetchOutcome::Body(body)
            }
            Err(e) => {
                error!(url = %request.url, "Failed to read response body: {}", e);
                FetchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_caller_headers_override_defaults() {
        let mut extra = HashMap::new();
        extra.insert("user-agent".to_string(), "threadsense/1.0".to_string());
        extra.insert("X-Api-Key".to_string(), "secret".to_string());

        let headers = merged_headers(&extra);
        assert_eq!(headers.get(USER_AGENT).unwrap(), "threadsense/1.0");
        assert_eq!(headers.get("x-api-key").unwrap(), "secret");
        assert_eq!(headers.get(ACCEPT).unwrap(), DEFAULT_ACCEPT);
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), DEFAULT_ACCEPT_LANGUAGE);
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let mut extra = HashMap::new();
        extra.insert("bad header".to_string(), "x".to_string());

        let headers = merged_headers(&extra);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_flatten_params_stringifies_scalars() {
        let body = json!({"text": "hello", "top": 3, "raw": true});
        let mut params = flatten_params(body.as_object().unwrap());
        params.sort();
        assert_eq!(
            params,
            vec![
                ("raw".to_string(), "true".to_string()),
                ("text".to_string(), "hello".to_string()),
                ("top".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_for_api_substitutes_text() {
        let api: ApiConfig = serde_json::from_value(json!({
            "name": "sentiment",
            "url": "https://sentiment.test",
            "method": "POST",
            "json_data": {"text": "data_string"},
            "headers": {"X-Key": "k"},
            "body_encoding": "json"
        }))
        .unwrap();

        let request = FetchRequest::for_api(&api, "some title");
        assert_eq!(request.url, "https://sentiment.test");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.encoding, BodyEncoding::Json);
        assert_eq!(request.body.unwrap()["text"], json!("some title"));
        assert_eq!(request.headers["X-Key"], "k");
    }

    #[tokio::test]
    async fn test_unreachable_host_collapses_to_sentinel() {
        // bind an ephemeral port, then close it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(Duration::from_secs(2), false).unwrap();
        let outcome = transport
            .fetch(FetchRequest::get(format!("http://{addr}/unreachable")))
            .await;
        assert!(outcome.is_failed());
        assert_eq!(outcome.body(), None);
    }
}
