//! MemoryStore - In-process reference backend
//!
//! TigerStyle: Simulation-first backend with one-shot fault injection.
//!
//! Records live per namespace in insertion order, which is the natural
//! storage order for tie-breaking sorts and for single-record removal.
//!
//! # Fault Injection
//!
//! ```rust
//! # async fn demo() {
//! use storecheck::{EntityStore, Entity, MemoryStore, Operation};
//!
//! let store = MemoryStore::new();
//! store.inject_fault(Operation::Save).await;
//! assert!(store.save(&Entity::make("foo")).await.is_err());
//! assert!(store.save(&Entity::make("foo")).await.is_ok());
//! # }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::backend::{raw_unsupported, EntityStore};
use super::entity::Entity;
use super::error::{BackendError, BackendResult};
use super::namespace::Namespace;
use super::query::{LoadCriteria, Query, Selector};
use super::value::Value;

/// Backend name reported by `MemoryStore`
pub const MEMORY_STORE_NAME: &str = "memory";

// =============================================================================
// Configuration
// =============================================================================

/// Save semantics for `MemoryStore`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Merge saved fields into the stored record instead of replacing them.
    #[serde(default)]
    pub merge: bool,
}

/// A store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Save,
    List,
    Remove,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::List => "list",
            Self::Remove => "remove",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Debug, Clone)]
struct StoredRecord {
    id: String,
    fields: BTreeMap<String, Value>,
}

impl StoredRecord {
    fn to_entity(&self, namespace: &Namespace) -> Entity {
        Entity::new(namespace.clone())
            .with_id(self.id.clone())
            .with_fields(self.fields.clone())
    }
}

/// In-memory `EntityStore`.
///
/// Thread-safe via `tokio::sync::RwLock`; every returned entity is a deep
/// copy of the stored record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: MemoryStoreConfig,
    collections: RwLock<HashMap<Namespace, Vec<StoredRecord>>>,
    faults: RwLock<HashSet<Operation>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store with replace semantics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create an empty store with merge semantics.
    #[must_use]
    pub fn merging() -> Self {
        Self::with_config(MemoryStoreConfig { merge: true })
    }

    /// Make the next call of `operation` fail with `BackendError::Injected`.
    pub async fn inject_fault(&self, operation: Operation) {
        self.faults.write().await.insert(operation);
    }

    /// Number of records stored in `namespace`.
    pub async fn count(&self, namespace: &Namespace) -> usize {
        self.collections
            .read()
            .await
            .get(namespace)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn guard(&self, operation: Operation) -> BackendResult<()> {
        if self.is_closed() {
            return Err(BackendError::connection(format!(
                "{MEMORY_STORE_NAME} store is closed"
            )));
        }
        if self.faults.write().await.remove(&operation) {
            tracing::debug!(backend = MEMORY_STORE_NAME, %operation, "injected fault fired");
            return Err(BackendError::injected(operation.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    fn name(&self) -> &str {
        MEMORY_STORE_NAME
    }

    async fn load(
        &self,
        namespace: &Namespace,
        criteria: &LoadCriteria,
    ) -> BackendResult<Option<Entity>> {
        self.guard(Operation::Load).await?;

        let collections = self.collections.read().await;
        let Some(records) = collections.get(namespace) else {
            return Ok(None);
        };

        let found = match criteria {
            LoadCriteria::Id(id) => records
                .iter()
                .find(|record| &record.id == id)
                .map(|record| record.to_entity(namespace)),
            LoadCriteria::Selector(selector) => {
                let matches = records
                    .iter()
                    .map(|record| record.to_entity(namespace))
                    .filter(|entity| selector.matches(entity))
                    .collect();
                selector.paginate(matches).into_iter().next()
            }
        };

        tracing::debug!(
            backend = MEMORY_STORE_NAME,
            namespace = %namespace,
            found = found.is_some(),
            "load"
        );
        Ok(found)
    }

    async fn save(&self, entity: &Entity) -> BackendResult<Entity> {
        self.guard(Operation::Save).await?;
        entity.check_fields()?;

        let namespace = entity.namespace();
        let id = match (entity.id(), entity.id_hint()) {
            (Some(id), _) | (None, Some(id)) => id.to_string(),
            (None, None) => Uuid::new_v4().to_string(),
        };

        let mut collections = self.collections.write().await;
        let records = collections.entry(namespace.clone()).or_default();

        let stored = match records.iter_mut().position(|record| record.id == id) {
            Some(index) => {
                let record = &mut records[index];
                if self.config.merge {
                    record
                        .fields
                        .extend(entity.fields().iter().map(|(k, v)| (k.clone(), v.clone())));
                } else {
                    record.fields = entity.fields().clone();
                }
                record.to_entity(namespace)
            }
            None => {
                let record = StoredRecord {
                    id: id.clone(),
                    fields: entity.fields().clone(),
                };
                let stored = record.to_entity(namespace);
                records.push(record);
                stored
            }
        };

        tracing::debug!(
            backend = MEMORY_STORE_NAME,
            namespace = %namespace,
            id = %id,
            merge = self.config.merge,
            "save"
        );
        Ok(stored)
    }

    async fn list(&self, namespace: &Namespace, query: &Query) -> BackendResult<Vec<Entity>> {
        self.guard(Operation::List).await?;

        let selector = match query {
            Query::Selector(selector) => selector,
            Query::Raw(_) | Query::Parameterized { .. } => return Err(raw_unsupported(self)),
        };

        let collections = self.collections.read().await;
        let matches: Vec<Entity> = collections
            .get(namespace)
            .into_iter()
            .flatten()
            .map(|record| record.to_entity(namespace))
            .filter(|entity| selector.matches(entity))
            .collect();

        let page = selector.paginate(matches);
        tracing::debug!(
            backend = MEMORY_STORE_NAME,
            namespace = %namespace,
            count = page.len(),
            "list"
        );
        Ok(page)
    }

    async fn remove(&self, namespace: &Namespace, selector: &Selector) -> BackendResult<()> {
        self.guard(Operation::Remove).await?;

        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(namespace) else {
            return Ok(());
        };

        let before = records.len();
        if selector.all() {
            records.retain(|record| !selector.matches(&record.to_entity(namespace)));
        } else if let Some(index) = records
            .iter()
            .position(|record| selector.matches(&record.to_entity(namespace)))
        {
            records.remove(index);
        }

        tracing::debug!(
            backend = MEMORY_STORE_NAME,
            namespace = %namespace,
            removed = before - records.len(),
            "remove"
        );
        Ok(())
    }

    async fn close(&self) -> BackendResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.guard(Operation::Close).await?;
        self.closed.store(true, Ordering::SeqCst);
        tracing::info!(backend = MEMORY_STORE_NAME, "store closed");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
