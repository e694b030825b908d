//! Scenario Runner

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;

use super::error::SuiteError;
use super::report::SuiteReport;
use super::SETUP_CATEGORY;
use crate::config::SuiteSettings;
use crate::shutdown::CompletionSignal;
use crate::storage::{EntityStore, Namespace, Selector};

/// Result of one step.
pub type StepResult = Result<(), SuiteError>;

/// A step body: borrows the context for the duration of its future.
pub type StepFn<F> = for<'a> fn(&'a mut StepContext<F>) -> BoxFuture<'a, StepResult>;

/// Everything a step can touch.
pub struct StepContext<F> {
    /// Backend under test
    pub store: Arc<dyn EntityStore>,
    /// Suite options (`must_merge`, raw queries)
    pub settings: SuiteSettings,
    /// Carryover state written by earlier steps
    pub fixture: F,
}

/// A named step within a category.
pub struct Step<F> {
    pub category: &'static str,
    pub label: &'static str,
    run: StepFn<F>,
}

/// An ordered list of steps sharing one fixture.
pub struct Suite<F> {
    name: &'static str,
    clears: Vec<Namespace>,
    steps: Vec<Step<F>>,
}

impl<F: Default + Send> Suite<F> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            clears: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Empty `namespace` with `remove(all$)` before the first step.
    #[must_use]
    pub fn clears(mut self, namespace: Namespace) -> Self {
        self.clears.push(namespace);
        self
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, category: &'static str, label: &'static str, run: StepFn<F>) -> Self {
        self.steps.push(Step {
            category,
            label,
            run,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn steps(&self) -> &[Step<F>] {
        &self.steps
    }

    /// Run setup then every step in order, stopping at the first failure.
    pub async fn run(&self, store: Arc<dyn EntityStore>, settings: SuiteSettings) -> SuiteReport {
        let started = Instant::now();
        let mut report = SuiteReport::new(self.name, store.name());
        tracing::info!(suite = self.name, backend = store.name(), "suite started");

        for namespace in &self.clears {
            let label = format!("clear {namespace}");
            let step_started = Instant::now();
            match store.remove(namespace, &Selector::everything()).await {
                Ok(()) => report.record_pass(SETUP_CATEGORY, &label, step_started.elapsed()),
                Err(e) => {
                    tracing::error!(
                        suite = self.name,
                        category = SETUP_CATEGORY,
                        step = %label,
                        error = %e,
                        "[FAILED]"
                    );
                    report.record_failure(
                        SETUP_CATEGORY,
                        &label,
                        step_started.elapsed(),
                        SuiteError::Backend(e),
                    );
                    return self.finish(report, started);
                }
            }
        }

        let mut ctx = StepContext {
            store,
            settings,
            fixture: F::default(),
        };

        for step in &self.steps {
            let step_started = Instant::now();
            match (step.run)(&mut ctx).await {
                Ok(()) => {
                    tracing::info!(
                        suite = self.name,
                        category = step.category,
                        step = step.label,
                        "[PASSED]"
                    );
                    report.record_pass(step.category, step.label, step_started.elapsed());
                }
                Err(e) => {
                    tracing::error!(
                        suite = self.name,
                        category = step.category,
                        step = step.label,
                        error = %e,
                        "[FAILED]"
                    );
                    report.record_failure(step.category, step.label, step_started.elapsed(), e);
                    break;
                }
            }
        }

        self.finish(report, started)
    }

    /// Run, then fire `signal` exactly once whatever the outcome.
    pub async fn run_signaled(
        &self,
        store: Arc<dyn EntityStore>,
        settings: SuiteSettings,
        signal: CompletionSignal,
    ) -> SuiteReport {
        let report = self.run(store, settings).await;
        signal.complete();
        report
    }

    fn finish(&self, mut report: SuiteReport, started: Instant) -> SuiteReport {
        report.elapsed = started.elapsed();
        match &report.failure {
            None => tracing::info!(
                suite = self.name,
                steps = report.steps.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "suite passed"
            ),
            Some(failure) => tracing::error!(
                suite = self.name,
                step = %failure.step,
                passed = report.passed_count(),
                "suite failed"
            ),
        }
        report
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BackendError, Entity, MemoryStore, Operation, Query};
    use crate::{check, check_eq};

    #[derive(Default)]
    struct Counter {
        saved: usize,
    }

    async fn save_one(ctx: &mut StepContext<Counter>) -> StepResult {
        ctx.store.save(&Entity::make("foo").with("p1", "v1")).await?;
        ctx.fixture.saved += 1;
        Ok(())
    }

    async fn count_is_one(ctx: &mut StepContext<Counter>) -> StepResult {
        let list = ctx
            .store
            .list(&Namespace::named("foo"), &Query::default())
            .await?;
        check_eq!(list.len(), ctx.fixture.saved);
        Ok(())
    }

    async fn always_fails(_ctx: &mut StepContext<Counter>) -> StepResult {
        check!(false, "deliberate");
        Ok(())
    }

    fn suite() -> Suite<Counter> {
        Suite::new("counter")
            .clears(Namespace::named("foo"))
            .step("[Test]", "save", |ctx| Box::pin(save_one(ctx)))
            .step("[Test]", "count", |ctx| Box::pin(count_is_one(ctx)))
    }

    #[tokio::test]
    async fn test_setup_clears_then_steps_run_in_order() {
        let store = Arc::new(MemoryStore::new());
        store.save(&Entity::make("foo").with("stale", true)).await.unwrap();

        let report = suite().run(store, SuiteSettings::default()).await;
        assert!(report.passed(), "{:?}", report.failure);
        assert_eq!(report.labels(), vec!["clear -/-/foo", "save", "count"]);
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let suite = suite()
            .step("[Test]", "boom", |ctx| Box::pin(always_fails(ctx)))
            .step("[Test]", "never", |ctx| Box::pin(save_one(ctx)));

        let report = suite
            .run(Arc::new(MemoryStore::new()), SuiteSettings::default())
            .await;

        let failure = report.failure.clone().unwrap();
        assert_eq!(failure.step, "boom");
        assert!(failure.error.is_assertion());
        assert!(!report.labels().contains(&"never"));
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_unchanged() {
        let store = Arc::new(MemoryStore::new());
        store.inject_fault(Operation::Save).await;

        let report = suite().run(store, SuiteSettings::default()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, "save");
        assert_eq!(
            failure.error,
            SuiteError::Backend(BackendError::injected("save"))
        );
    }

    #[tokio::test]
    async fn test_setup_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.inject_fault(Operation::Remove).await;

        let report = suite().run(store, SuiteSettings::default()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.step, "clear -/-/foo");
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].category, SETUP_CATEGORY);
    }
}
