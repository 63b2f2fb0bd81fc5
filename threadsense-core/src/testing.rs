//! Test doubles for code that talks to the network through [`Transport`].

use crate::transport::{FetchOutcome, FetchRequest, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A transport that replays scripted outcomes per URL and records every
/// request it receives.
///
/// Queued outcomes for a URL are served first, in order. Once the queue is
/// drained the URL's standing response is used; URLs with neither get the
/// failure sentinel.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    standing: Mutex<HashMap<String, FetchOutcome>>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `body`.
    pub fn respond(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.set_standing(url.into(), FetchOutcome::Body(body.into()));
        self
    }

    /// Always answer `url` with the failure sentinel.
    pub fn fail(self, url: impl Into<String>) -> Self {
        self.set_standing(url.into(), FetchOutcome::Failed);
        self
    }

    /// Serve `outcomes` for `url` one per call before falling back to the
    /// standing response.
    pub fn respond_sequence(self, url: impl Into<String>, outcomes: Vec<FetchOutcome>) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .extend(outcomes);
        self
    }

    fn set_standing(&self, url: String, outcome: FetchOutcome) {
        self.standing.lock().unwrap().insert(url, outcome);
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<FetchRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url == url)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        let url = request.url.clone();
        self.calls.lock().unwrap().push(request);

        if let Some(outcome) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }

        self.standing
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or(FetchOutcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_then_standing_response() {
        let transport = ScriptedTransport::new()
            .respond("https://a.test", "ok")
            .respond_sequence("https://a.test", vec![FetchOutcome::Failed]);

        let first = transport.fetch(FetchRequest::get("https://a.test")).await;
        let second = transport.fetch(FetchRequest::get("https://a.test")).await;
        let unknown = transport.fetch(FetchRequest::get("https://b.test")).await;

        assert!(first.is_failed());
        assert_eq!(second.body(), Some("ok"));
        assert!(unknown.is_failed());
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.calls_to("https://a.test").len(), 2);
    }
}
