//! Runs every configured analysis API over the matched fields of each
//! record and persists results as fields complete.

use crate::retry::{calculate_delay, FieldState, FieldTracker, RetryConfig};
use database::PersistenceGateway;
use std::sync::Arc;
use threadsense_core::{
    AnalysisResult, ApiConfig, ErrorExt, ExtractedRecord, FetchRequest, TrackedField, Transport,
};
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub id: String,
    pub fields: Vec<(TrackedField, FieldState)>,
    pub api_calls: usize,
    /// Whether at least one upsert for this record went through.
    pub persisted: bool,
}

impl AnalysisReport {
    pub fn succeeded_fields(&self) -> usize {
        self.fields
            .iter()
            .filter(|(_, state)| matches!(state, FieldState::Succeeded { .. }))
            .count()
    }

    pub fn exhausted_fields(&self) -> usize {
        self.fields
            .iter()
            .filter(|(_, state)| matches!(state, FieldState::ExhaustedRetries { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The id was already stored; nothing was called or written.
    AlreadyPersisted,
    /// The store could not answer whether the id exists; the record was skipped.
    ExistenceCheckFailed,
    Analyzed(AnalysisReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub records: usize,
    pub already_persisted: usize,
    pub check_failures: usize,
    pub persisted: usize,
    pub exhausted_fields: usize,
    pub api_calls: usize,
}

impl BatchReport {
    fn add(&mut self, outcome: &RecordOutcome) {
        self.records += 1;
        match outcome {
            RecordOutcome::AlreadyPersisted => self.already_persisted += 1,
            RecordOutcome::ExistenceCheckFailed => self.check_failures += 1,
            RecordOutcome::Analyzed(report) => {
                if report.persisted {
                    self.persisted += 1;
                }
                self.exhausted_fields += report.exhausted_fields();
                self.api_calls += report.api_calls;
            }
        }
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.records += other.records;
        self.already_persisted += other.already_persisted;
        self.check_failures += other.check_failures;
        self.persisted += other.persisted;
        self.exhausted_fields += other.exhausted_fields;
        self.api_calls += other.api_calls;
    }
}

pub struct AnalysisOrchestrator<T: Transport + ?Sized, G: PersistenceGateway + ?Sized> {
    transport: Arc<T>,
    gateway: Arc<G>,
    apis: Vec<ApiConfig>,
    retry: RetryConfig,
}

impl<T: Transport + ?Sized, G: PersistenceGateway + ?Sized> AnalysisOrchestrator<T, G> {
    pub fn new(transport: Arc<T>, gateway: Arc<G>, apis: Vec<ApiConfig>, retry: RetryConfig) -> Self {
        Self {
            transport,
            gateway,
            apis,
            retry,
        }
    }

    pub fn apis(&self) -> &[ApiConfig] {
        &self.apis
    }

    /// One pass over every API for one field. Every API is called even after
    /// a failure; `None` if any of them returned the failure sentinel.
    pub async fn analyze_field(&self, field: TrackedField, text: &str) -> Option<Vec<AnalysisResult>> {
        let mut results = Vec::with_capacity(self.apis.len());
        let mut failed = false;

        for api in &self.apis {
            let outcome = self.transport.fetch(FetchRequest::for_api(api, text)).await;
            match outcome.body() {
                Some(body) => results.push(AnalysisResult::from_response(&api.name, field, body)),
                None => {
                    debug!(api = %api.name, %field, "Analysis call failed");
                    failed = true;
                }
            }
        }

        if failed {
            None
        } else {
            Some(results)
        }
    }

    pub async fn process_record(&self, record: ExtractedRecord) -> RecordOutcome {
        let span = info_span!("analysis", record = %record.id, community = %record.community);
        self.process_record_inner(record).instrument(span).await
    }

    async fn process_record_inner(&self, mut record: ExtractedRecord) -> RecordOutcome {
        match self.gateway.exists(&record.id).await {
            Ok(true) => {
                debug!("Record already persisted, skipping");
                return RecordOutcome::AlreadyPersisted;
            }
            Ok(false) => {}
            Err(e) => {
                e.log_error();
                warn!("Existence check failed, skipping record");
                return RecordOutcome::ExistenceCheckFailed;
            }
        }

        let mut tracker = FieldTracker::new(&record.matched_fields, self.retry.budget);
        let mut api_calls = 0;
        let mut persisted = false;
        let mut pass = 0;

        while tracker.has_pending() {
            if pass > 0 {
                let delay = calculate_delay(pass - 1, &self.retry);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            pass += 1;

            for field in tracker.pending() {
                let Some(text) = record.field_text(field).map(str::to_string) else {
                    // matched fields always carry text; treat a gap as a spent attempt
                    tracker.record_failure(field);
                    continue;
                };

                api_calls += self.apis.len();
                match self.analyze_field(field, &text).await {
                    Some(results) => {
                        tracker.record_success(field);
                        record.append_analyses(results);
                        match self.gateway.upsert(&record).await {
                            Ok(()) => persisted = true,
                            Err(e) => {
                                e.log_error();
                            }
                        }
                    }
                    None => tracker.record_failure(field),
                }
            }
        }

        let report = AnalysisReport {
            id: record.id.clone(),
            fields: tracker.into_states(),
            api_calls,
            persisted,
        };
        info!(
            passes = pass,
            succeeded = report.succeeded_fields(),
            exhausted = report.exhausted_fields(),
            persisted,
            "Record analyzed"
        );
        RecordOutcome::Analyzed(report)
    }

    /// Processes records one at a time in the order given.
    pub async fn process_batch(&self, records: Vec<ExtractedRecord>) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            let outcome = self.process_record(record).await;
            report.add(&outcome);
        }
        report
    }
}
