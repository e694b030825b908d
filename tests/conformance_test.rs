//! Conformance suites against reference and deliberately broken backends

use std::sync::Arc;

use async_trait::async_trait;
use storecheck::{
    suites, BackendError, BackendResult, CompletionTracker, Entity, EntityStore, LoadCriteria,
    MemoryStore, Namespace, Operation, Query, Selector, ShutdownCoordinator, ShutdownPolicy,
    SortOrder, SuiteError, SuiteKind, SuiteSettings, Value,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
}

// =============================================================================
// Test backends
// =============================================================================

/// Memory store that answers the default raw product queries.
///
/// Recognizes only queries over `product` ordered by price; a parameterized
/// query is read as an inclusive `[min, max]` price range.
struct ProductSqlStore {
    inner: MemoryStore,
}

#[async_trait]
impl EntityStore for ProductSqlStore {
    fn name(&self) -> &str {
        "product-sql"
    }

    fn supports_raw_queries(&self) -> bool {
        true
    }

    async fn load(&self, ns: &Namespace, criteria: &LoadCriteria) -> BackendResult<Option<Entity>> {
        self.inner.load(ns, criteria).await
    }

    async fn save(&self, entity: &Entity) -> BackendResult<Entity> {
        self.inner.save(entity).await
    }

    async fn list(&self, ns: &Namespace, query: &Query) -> BackendResult<Vec<Entity>> {
        let by_price = Query::from(Selector::new().with_sort("price", SortOrder::Ascending));
        match query {
            Query::Selector(_) => self.inner.list(ns, query).await,
            Query::Raw(sql) if sql.contains("FROM product") => self.inner.list(ns, &by_price).await,
            Query::Parameterized { sql, params } if sql.contains("FROM product") => {
                let (min, max) = match params.as_slice() {
                    [min, max] => (min.as_f64(), max.as_f64()),
                    _ => return Err(BackendError::invalid_query("expected two price bounds")),
                };
                let (Some(min), Some(max)) = (min, max) else {
                    return Err(BackendError::invalid_query("price bounds must be numbers"));
                };
                let products = self.inner.list(ns, &by_price).await?;
                Ok(products
                    .into_iter()
                    .filter(|p| {
                        p.get("price")
                            .and_then(Value::as_f64)
                            .is_some_and(|price| (min..=max).contains(&price))
                    })
                    .collect())
            }
            other => Err(BackendError::invalid_query(format!("unrecognized query {other:?}"))),
        }
    }

    async fn remove(&self, ns: &Namespace, selector: &Selector) -> BackendResult<()> {
        self.inner.remove(ns, selector).await
    }
}

/// Memory store that silently ignores `sort$`.
struct UnsortedStore {
    inner: MemoryStore,
}

#[async_trait]
impl EntityStore for UnsortedStore {
    fn name(&self) -> &str {
        "unsorted"
    }

    async fn load(&self, ns: &Namespace, criteria: &LoadCriteria) -> BackendResult<Option<Entity>> {
        self.inner.load(ns, criteria).await
    }

    async fn save(&self, entity: &Entity) -> BackendResult<Entity> {
        self.inner.save(entity).await
    }

    async fn list(&self, ns: &Namespace, query: &Query) -> BackendResult<Vec<Entity>> {
        let Query::Selector(selector) = query else {
            return self.inner.list(ns, query).await;
        };
        let mut unsorted = Selector::new();
        for (field, value) in selector.fields() {
            unsorted = unsorted.matching(field.clone(), value.clone());
        }
        if let Some(limit) = selector.limit() {
            unsorted = unsorted.with_limit(limit);
        }
        if let Some(skip) = selector.skip() {
            unsorted = unsorted.with_skip(skip);
        }
        self.inner.list(ns, &unsorted.into()).await
    }

    async fn remove(&self, ns: &Namespace, selector: &Selector) -> BackendResult<()> {
        self.inner.remove(ns, selector).await
    }
}

/// Memory store whose selectors skip list and map fields, so `[2]` matches
/// any stored array.
struct ContainmentStore {
    inner: MemoryStore,
}

impl ContainmentStore {
    fn scalar_only(selector: &Selector) -> Selector {
        let mut loose = Selector::new();
        for (field, value) in selector.fields() {
            if !matches!(value, Value::List(_) | Value::Map(_)) {
                loose = loose.matching(field.clone(), value.clone());
            }
        }
        for (field, order) in selector.sort() {
            loose = loose.with_sort(field.clone(), *order);
        }
        loose.with_all(selector.all())
    }
}

#[async_trait]
impl EntityStore for ContainmentStore {
    fn name(&self) -> &str {
        "containment"
    }

    async fn load(&self, ns: &Namespace, criteria: &LoadCriteria) -> BackendResult<Option<Entity>> {
        self.inner.load(ns, criteria).await
    }

    async fn save(&self, entity: &Entity) -> BackendResult<Entity> {
        self.inner.save(entity).await
    }

    async fn list(&self, ns: &Namespace, query: &Query) -> BackendResult<Vec<Entity>> {
        match query {
            Query::Selector(selector) => {
                self.inner.list(ns, &Self::scalar_only(selector).into()).await
            }
            other => self.inner.list(ns, other).await,
        }
    }

    async fn remove(&self, ns: &Namespace, selector: &Selector) -> BackendResult<()> {
        self.inner.remove(ns, &Self::scalar_only(selector)).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_memory_store_passes_selector_suites() {
    init_tracing();

    for (store, settings) in [
        (MemoryStore::new(), SuiteSettings::default()),
        (MemoryStore::merging(), SuiteSettings::merging()),
    ] {
        let store: Arc<dyn EntityStore> = Arc::new(store);
        for kind in [SuiteKind::Basic, SuiteKind::Sort, SuiteKind::Limits] {
            let report = kind.run(Arc::clone(&store), settings.clone()).await;
            assert!(
                report.passed(),
                "{kind} (must_merge={}) failed: {:?}",
                settings.must_merge,
                report.failure
            );
        }
    }
}

#[tokio::test]
async fn test_raw_query_suite_on_sql_capable_store() {
    init_tracing();
    let store = Arc::new(ProductSqlStore {
        inner: MemoryStore::new(),
    });

    let report = suites::raw_query::suite()
        .run(store.clone(), SuiteSettings::default())
        .await;

    assert!(report.passed(), "{:?}", report.failure);
    assert_eq!(
        report.labels(),
        vec!["clear -/-/product", "setup", "query_string", "query_params", "teardown"]
    );
    assert_eq!(store.inner.count(&Namespace::named("product")).await, 0);
}

#[tokio::test]
async fn test_ignored_sort_aborts_at_first_sorted_list() {
    init_tracing();
    let store = Arc::new(UnsortedStore {
        inner: MemoryStore::new(),
    });

    let report = SuiteKind::Sort.run(store, SuiteSettings::default()).await;

    let failure = report.failure.clone().expect("sort suite must fail");
    assert_eq!(failure.suite, "sort");
    assert_eq!(failure.step, "listasc");
    assert!(failure.error.is_assertion());
    assert!(!report.labels().contains(&"listdesc"));
}

#[tokio::test]
async fn test_containment_matching_aborts_at_structured_list() {
    init_tracing();
    let store = Arc::new(ContainmentStore {
        inner: MemoryStore::new(),
    });

    let report = SuiteKind::Basic.run(store, SuiteSettings::default()).await;

    let failure = report.failure.expect("basic suite must fail");
    assert_eq!(failure.step, "query7");
    assert!(failure.error.is_assertion());
}

#[tokio::test]
async fn test_partial_array_remove_keeps_record() {
    init_tracing();
    let store = MemoryStore::new();
    let ns = Namespace::qualified("zen", "moon", "bar");
    let arr = |json: serde_json::Value| Selector::new().matching("arr", Value::from(json));

    store
        .save(&Entity::new(ns.clone()).with("arr", Value::from(serde_json::json!([2, 3]))))
        .await
        .unwrap();

    store.remove(&ns, &arr(serde_json::json!([2]))).await.unwrap();
    assert_eq!(store.count(&ns).await, 1);

    store.remove(&ns, &arr(serde_json::json!([2, 3]))).await.unwrap();
    assert_eq!(store.count(&ns).await, 0);
}

#[tokio::test]
async fn test_backend_fault_surfaces_as_original_error() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.inject_fault(Operation::Load).await;

    let report = SuiteKind::Basic.run(store, SuiteSettings::default()).await;

    let failure = report.failure.expect("basic suite must fail");
    assert_eq!(failure.step, "load0");
    assert_eq!(failure.error, SuiteError::Backend(BackendError::injected("load")));
}

#[tokio::test]
async fn test_suites_then_coordinated_close() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let tracker = CompletionTracker::new();
    let kinds = [SuiteKind::Basic, SuiteKind::Sort, SuiteKind::Limits];
    let signals: Vec<_> = kinds.iter().map(|k| (*k, tracker.signal(k.name()))).collect();

    let runner = tokio::spawn({
        let store: Arc<dyn EntityStore> = store.clone();
        async move {
            let mut reports = Vec::new();
            for (kind, signal) in signals {
                reports.push(
                    kind.run_signaled(Arc::clone(&store), SuiteSettings::default(), signal)
                        .await,
                );
            }
            reports
        }
    });

    let shutdown = ShutdownCoordinator::new(tracker, ShutdownPolicy::default())
        .close(&*store, kinds.len())
        .await;
    let reports = runner.await.unwrap();

    assert!(shutdown.confirmed);
    assert_eq!(shutdown.completed, 3);
    assert!(shutdown.close_error.is_none());
    assert!(reports.iter().all(|r| r.passed()));
    assert!(store.is_closed());
}
