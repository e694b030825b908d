//! Store Contract - The EntityStore trait
//!
//! TigerStyle: Abstract interface for entity storage.
//!
//! Every backend under test implements this trait and must satisfy the same
//! conformance suites. Not-found is never an error; failures are always an
//! explicit `BackendError`.

use async_trait::async_trait;

use super::entity::Entity;
use super::error::{BackendError, BackendResult};
use super::namespace::Namespace;
use super::query::{LoadCriteria, Query, Selector};

/// Abstract storage backend for entities.
///
/// TigerStyle: All operations are async, return explicit errors, and hand
/// back decoupled copies.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Backend name used in logs and reports.
    fn name(&self) -> &str;

    /// True when `list` accepts `Query::Raw` and `Query::Parameterized`.
    fn supports_raw_queries(&self) -> bool {
        false
    }

    /// Load the first record in `namespace` matching `criteria`.
    ///
    /// Returns None if no record matches.
    async fn load(
        &self,
        namespace: &Namespace,
        criteria: &LoadCriteria,
    ) -> BackendResult<Option<Entity>>;

    /// Create or update a record.
    ///
    /// An entity without an id is created under its `id$` hint, or a fresh
    /// UUID v4. An entity with an id replaces the stored field set (merges
    /// it, when the backend is configured to merge); a missing record is
    /// created. The returned entity carries the persisted id.
    async fn save(&self, entity: &Entity) -> BackendResult<Entity>;

    /// List records in `namespace` matching `query`.
    async fn list(&self, namespace: &Namespace, query: &Query) -> BackendResult<Vec<Entity>>;

    /// Remove the first record matching `selector`, or every match when
    /// `all$` is set. Removing nothing is not an error.
    async fn remove(&self, namespace: &Namespace, selector: &Selector) -> BackendResult<()>;

    /// Release backend resources.
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }
}

/// Error for backends that only speak selectors.
pub(crate) fn raw_unsupported(store: &dyn EntityStore) -> BackendError {
    BackendError::unsupported(store.name(), "raw queries")
}
