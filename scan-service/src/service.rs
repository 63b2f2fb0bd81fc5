use analysis_engine::{AnalysisOrchestrator, BatchReport, RetryConfig};
use database::PersistenceGateway;
use futures::stream::{self, StreamExt};
use reddit_client::{ContentExtractor, Discovery, DiscoveryPage, ExhaustionReason, Permalink};
use std::sync::Arc;
use threadsense_core::{
    ApiConfig, ErrorExt, ExtractedRecord, FetchOutcome, FetchRequest, Settings, Transport,
};
use tracing::{debug, info, info_span, warn, Instrument};

/// Totals for one run of the scan loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub pages: u32,
    pub candidates: usize,
    pub threads_fetched: usize,
    pub thread_failures: usize,
    pub records: usize,
    pub analysis: BatchReport,
    pub exhaustion: Option<ExhaustionReason>,
}

pub struct ScanService<T: Transport + ?Sized, G: PersistenceGateway + ?Sized> {
    transport: Arc<T>,
    discovery: Discovery,
    extractor: ContentExtractor,
    orchestrator: AnalysisOrchestrator<T, G>,
    base_url: String,
    max_concurrent_fetches: usize,
}

impl<T: Transport + ?Sized, G: PersistenceGateway + ?Sized> ScanService<T, G> {
    pub fn new(
        settings: &Settings,
        transport: Arc<T>,
        gateway: Arc<G>,
        apis: Vec<ApiConfig>,
        keywords: &[String],
    ) -> Self {
        let orchestrator = AnalysisOrchestrator::new(
            transport.clone(),
            gateway,
            apis,
            RetryConfig::from_settings(settings),
        );
        Self {
            transport,
            discovery: Discovery::new(settings.reddit_base_url.as_str(), settings.max_pages),
            extractor: ContentExtractor::from_keywords(keywords),
            orchestrator,
            base_url: settings.reddit_base_url.trim_end_matches('/').to_string(),
            max_concurrent_fetches: settings.max_concurrent_fetches.max(1),
        }
    }

    /// Pages through discovery until it is exhausted, analyzing each batch
    /// before the next page is requested.
    pub async fn run(&mut self) -> ScanSummary {
        info!(
            apis = self.orchestrator.apis().len(),
            concurrency = self.max_concurrent_fetches,
            "Starting scan"
        );
        let mut summary = ScanSummary::default();

        loop {
            let span = info_span!("discovery", cursor = ?self.discovery.cursor());
            let page = self
                .discovery
                .next_page(self.transport.as_ref())
                .instrument(span)
                .await;

            let candidates = match page {
                DiscoveryPage::Candidates(candidates) => candidates,
                DiscoveryPage::Exhausted(reason) => {
                    info!(?reason, "Discovery exhausted");
                    summary.exhaustion = Some(reason);
                    break;
                }
            };

            let batch = self.discovery.pages_fetched();
            self.process_batch(candidates, &mut summary)
                .instrument(info_span!("batch", page = batch))
                .await;
        }

        summary.pages = self.discovery.pages_fetched();
        info!(
            pages = summary.pages,
            records = summary.records,
            persisted = summary.analysis.persisted,
            "Scan finished"
        );
        summary
    }

    async fn process_batch(&self, candidates: Vec<Permalink>, summary: &mut ScanSummary) {
        summary.candidates += candidates.len();

        let records = self.fetch_records(candidates, summary).await;
        summary.records += records.len();
        debug!(records = records.len(), "Batch extracted");

        let report = self.orchestrator.process_batch(records).await;
        summary.analysis.merge(&report);
    }

    /// Fetches every thread in the batch, at most `max_concurrent_fetches`
    /// at a time, and extracts records in candidate order.
    async fn fetch_records(
        &self,
        candidates: Vec<Permalink>,
        summary: &mut ScanSummary,
    ) -> Vec<ExtractedRecord> {
        let transport = &self.transport;
        let base_url = self.base_url.as_str();

        let responses: Vec<(Permalink, FetchOutcome)> = stream::iter(candidates)
            .map(|permalink| async move {
                let url = permalink.thread_json_url(base_url);
                let outcome = transport.fetch(FetchRequest::get(url)).await;
                (permalink, outcome)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut records = Vec::new();
        for (permalink, outcome) in responses {
            let Some(body) = outcome.into_body() else {
                warn!(thread = %permalink.id, "Thread fetch failed, skipping");
                summary.thread_failures += 1;
                continue;
            };
            summary.threads_fetched += 1;

            match self.extractor.extract_thread(&body, &permalink) {
                Ok(extracted) => records.extend(extracted),
                Err(e) => {
                    e.log_warn();
                }
            }
        }
        records
    }
}
