//! Storage - Store Contract, Entity Model and Reference Backends
//!
//! TigerStyle: One async contract, many backends, identical semantics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    EntityStore Trait                         │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │   MemoryStore   │           │  PostgresStore  │
//! │ (reference,     │           │ (raw queries,   │
//! │  fault inject)  │           │  feature gated) │
//! └─────────────────┘           └─────────────────┘
//! ```

mod backend;
mod entity;
mod error;
mod memory;
mod namespace;
mod query;
mod value;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::EntityStore;
pub use entity::Entity;
pub use error::{BackendError, BackendResult};
pub use memory::{MemoryStore, MemoryStoreConfig, Operation};
pub use namespace::Namespace;
pub use query::{LoadCriteria, Query, Selector, SortOrder};
pub use value::{matches_pattern, Value};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

/// True when `key` is reserved for identity or control directives.
pub(crate) fn is_reserved_key(key: &str) -> bool {
    key == crate::ID_FIELD || key.ends_with(crate::DIRECTIVE_SUFFIX)
}
