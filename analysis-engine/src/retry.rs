use std::time::Duration;
use threadsense_core::{Settings, TrackedField};
use tracing::debug;

/// Configuration for the per-record retry passes
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of passes, and so attempts per field
    pub budget: u32,
    /// Base delay between passes (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between passes (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            budget: 10,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            budget: settings.retry_budget,
            base_delay_ms: settings.retry_delay_ms,
            ..Self::default()
        }
    }

    /// Retry passes with no delay between them.
    pub fn immediate(budget: u32) -> Self {
        Self {
            budget,
            base_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Delay before pass `pass + 1`, exponential with jitter and capped.
pub fn calculate_delay(pass: u32, config: &RetryConfig) -> Duration {
    if config.base_delay_ms == 0 {
        return Duration::ZERO;
    }
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let multiplier = config.backoff_multiplier.powi(pass as i32);
    let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
    let exponential_delay = Duration::from_millis(delay_ms.min(config.max_delay_ms));

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);

    (exponential_delay + Duration::from_millis(jitter)).min(max_delay)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Pending { attempts: u32 },
    Succeeded { attempts: u32 },
    ExhaustedRetries { attempts: u32 },
}

impl FieldState {
    pub fn is_pending(&self) -> bool {
        matches!(self, FieldState::Pending { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            FieldState::Pending { attempts }
            | FieldState::Succeeded { attempts }
            | FieldState::ExhaustedRetries { attempts } => attempts,
        }
    }
}

/// Per-field state for one record's analysis, driven by the outer pass loop.
#[derive(Debug, Clone)]
pub struct FieldTracker {
    states: Vec<(TrackedField, FieldState)>,
    budget: u32,
}

impl FieldTracker {
    pub fn new(fields: &[TrackedField], budget: u32) -> Self {
        Self {
            states: fields
                .iter()
                .map(|field| (*field, FieldState::Pending { attempts: 0 }))
                .collect(),
            budget,
        }
    }

    pub fn pending(&self) -> Vec<TrackedField> {
        self.states
            .iter()
            .filter(|(_, state)| state.is_pending())
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.states.iter().any(|(_, state)| state.is_pending())
    }

    pub fn record_success(&mut self, field: TrackedField) {
        self.transition(field, |attempts, _| FieldState::Succeeded {
            attempts: attempts + 1,
        });
    }

    pub fn record_failure(&mut self, field: TrackedField) {
        self.transition(field, |attempts, budget| {
            let attempts = attempts + 1;
            if attempts >= budget {
                debug!(%field, attempts, "Field exhausted its retry budget");
                FieldState::ExhaustedRetries { attempts }
            } else {
                FieldState::Pending { attempts }
            }
        });
    }

    fn transition(&mut self, field: TrackedField, next: impl FnOnce(u32, u32) -> FieldState) {
        let budget = self.budget;
        if let Some((_, state)) = self.states.iter_mut().find(|(f, _)| *f == field) {
            if let FieldState::Pending { attempts } = *state {
                *state = next(attempts, budget);
            }
        }
    }

    pub fn state(&self, field: TrackedField) -> Option<FieldState> {
        self.states
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, state)| *state)
    }

    pub fn into_states(self) -> Vec<(TrackedField, FieldState)> {
        self.states
    }
}
