//! Suite reports

use std::time::Duration;

use super::error::SuiteError;

/// Whether a step held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Passed,
    Failed,
}

/// One executed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Category label, e.g. `[Data tests]`
    pub category: String,
    /// Human label, e.g. `save1`
    pub label: String,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

/// The first failed step of a suite and its original error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("suite {suite} failed at {step}: {error}")]
pub struct SuiteFailure {
    pub suite: String,
    pub step: String,
    #[source]
    pub error: SuiteError,
}

/// Outcome of one suite run.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub suite: String,
    pub backend: String,
    pub steps: Vec<StepRecord>,
    pub failure: Option<SuiteFailure>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub(crate) fn new(suite: &str, backend: &str) -> Self {
        Self {
            suite: suite.to_string(),
            backend: backend.to_string(),
            steps: Vec::new(),
            failure: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn record_pass(&mut self, category: &str, label: &str, elapsed: Duration) {
        self.steps.push(StepRecord {
            category: category.to_string(),
            label: label.to_string(),
            outcome: StepOutcome::Passed,
            elapsed,
        });
    }

    pub(crate) fn record_failure(
        &mut self,
        category: &str,
        label: &str,
        elapsed: Duration,
        error: SuiteError,
    ) {
        self.steps.push(StepRecord {
            category: category.to_string(),
            label: label.to_string(),
            outcome: StepOutcome::Failed,
            elapsed,
        });
        self.failure = Some(SuiteFailure {
            suite: self.suite.clone(),
            step: label.to_string(),
            error,
        });
    }

    /// True when every step ran and held.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.outcome == StepOutcome::Passed)
            .count()
    }

    /// Labels of the steps that ran, in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.label.as_str()).collect()
    }
}
