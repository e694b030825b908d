//! Suites - The conformance scenario groups
//!
//! TigerStyle: Each suite starts from empty namespaces and stands alone.
//!
//! | Suite       | Namespaces            | Verifies                          |
//! |-------------|-----------------------|-----------------------------------|
//! | `basic`     | `foo`, `zen/moon/bar` | CRUD, merge policy, copies        |
//! | `sort`      | `foo`                 | `sort$` ascending and descending  |
//! | `limits`    | `foo`                 | `skip$`/`limit$` with `sort$`     |
//! | `raw_query` | `product`             | raw and parameterized passthrough |
//!
//! Suites sharing a namespace must run one after another.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::SuiteSettings;
use crate::harness::SuiteReport;
use crate::shutdown::CompletionSignal;
use crate::storage::{Entity, EntityStore};

pub mod basic;
pub mod limits;
pub mod raw_query;
pub mod sort;

/// One of the four suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SuiteKind {
    Basic,
    Sort,
    Limits,
    #[value(name = "raw_query", alias = "raw-query")]
    RawQuery,
}

impl SuiteKind {
    /// Every suite, in run order.
    #[must_use]
    pub fn all() -> [Self; 4] {
        [Self::Basic, Self::Sort, Self::Limits, Self::RawQuery]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => basic::SUITE_NAME,
            Self::Sort => sort::SUITE_NAME,
            Self::Limits => limits::SUITE_NAME,
            Self::RawQuery => raw_query::SUITE_NAME,
        }
    }

    /// True when the backend must support raw queries for this suite.
    #[must_use]
    pub fn requires_raw_queries(self) -> bool {
        matches!(self, Self::RawQuery)
    }

    pub async fn run(self, store: Arc<dyn EntityStore>, settings: SuiteSettings) -> SuiteReport {
        match self {
            Self::Basic => basic::suite().run(store, settings).await,
            Self::Sort => sort::suite().run(store, settings).await,
            Self::Limits => limits::suite().run(store, settings).await,
            Self::RawQuery => raw_query::suite().run(store, settings).await,
        }
    }

    /// Run and fire `signal` once the suite finishes.
    pub async fn run_signaled(
        self,
        store: Arc<dyn EntityStore>,
        settings: SuiteSettings,
        signal: CompletionSignal,
    ) -> SuiteReport {
        match self {
            Self::Basic => basic::suite().run_signaled(store, settings, signal).await,
            Self::Sort => sort::suite().run_signaled(store, settings, signal).await,
            Self::Limits => limits::suite().run_signaled(store, settings, signal).await,
            Self::RawQuery => {
                raw_query::suite()
                    .run_signaled(store, settings, signal)
                    .await
            }
        }
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SuiteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "sort" => Ok(Self::Sort),
            "limits" => Ok(Self::Limits),
            "raw_query" | "raw-query" | "sql" => Ok(Self::RawQuery),
            other => Err(format!("unknown suite `{other}`")),
        }
    }
}

/// `p1` of each entity, rendered as text.
pub(crate) fn p1_values(entities: &[Entity]) -> Vec<String> {
    entities
        .iter()
        .map(|e| e.get("p1").map(|v| v.to_text()).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::CompletionTracker;
    use crate::storage::MemoryStore;

    #[test]
    fn test_names_round_trip() {
        for kind in SuiteKind::all() {
            assert_eq!(kind.name().parse::<SuiteKind>(), Ok(kind));
        }
        assert!("nope".parse::<SuiteKind>().is_err());
    }

    #[tokio::test]
    async fn test_run_signaled_counts_failed_runs() {
        let tracker = CompletionTracker::new();
        let store = Arc::new(MemoryStore::new());

        let report = SuiteKind::RawQuery
            .run_signaled(store.clone(), SuiteSettings::default(), tracker.signal("raw_query"))
            .await;
        assert!(!report.passed());
        assert_eq!(tracker.completed(), 1);

        let report = SuiteKind::Limits
            .run_signaled(store, SuiteSettings::default(), tracker.signal("limits"))
            .await;
        assert!(report.passed(), "{:?}", report.failure);
        assert_eq!(tracker.completed(), 2);
    }

    #[tokio::test]
    async fn test_selector_suites_pass_on_memory_store() {
        for kind in [SuiteKind::Basic, SuiteKind::Sort, SuiteKind::Limits] {
            let report = kind
                .run(Arc::new(MemoryStore::new()), SuiteSettings::default())
                .await;
            assert!(report.passed(), "{kind}: {:?}", report.failure);
        }
    }
}
