pub mod orchestrator;
pub mod retry;


pub use orchestrator::{AnalysisOrchestrator, AnalysisReport, BatchReport, RecordOutcome};
pub use retry::{calculate_delay, FieldState, FieldTracker, RetryConfig};
