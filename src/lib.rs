//! storecheck - Entity Store Conformance
//!
//! TigerStyle: Executable contract for pluggable entity-storage backends.
//!
//! A backend passes when it honors the same CRUD-plus-query semantics every
//! other backend honors: merge-vs-replace saves, field deletion, copy
//! isolation, sort/skip/limit composition and raw-query passthrough.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Suites (basic, sort, limits, raw_query)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario Runner  │ ordered steps, fixture, abort on fail   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EntityStore trait │ load / save / list / remove / close    │
//! ├───────────────────┬─────────────────────────────────────────┤
//! │  MemoryStore      │ PostgresStore (feature = "postgres")    │
//! └───────────────────┴─────────────────────────────────────────┘
//!          ↓ completion signals
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Shutdown Coordinator │ bounded poll, best-effort close      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storecheck::{suites, EntityStore, MemoryStore, SuiteSettings};
//!
//! # async fn run() {
//! let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
//! let report = suites::basic::suite()
//!     .run(store, SuiteSettings::default())
//!     .await;
//! assert!(report.passed());
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod harness;
pub mod shutdown;
pub mod storage;
pub mod suites;

pub use config::{ConfigError, HarnessConfig, RawQueries, SuiteSettings};
pub use harness::{
    AssertionViolation, StepContext, StepResult, Suite, SuiteError, SuiteFailure, SuiteReport,
};
pub use shutdown::{
    CompletionSignal, CompletionTracker, ShutdownCoordinator, ShutdownPolicy, ShutdownReport,
};
pub use storage::{
    BackendError, BackendResult, Entity, EntityStore, LoadCriteria, MemoryStore,
    MemoryStoreConfig, Namespace, Operation, Query, Selector, SortOrder, Value,
};
pub use suites::SuiteKind;

#[cfg(feature = "postgres")]
pub use storage::PostgresStore;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Application name
pub const APP_NAME: &str = "storecheck";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rendered in place of an unset namespace component
pub const NAMESPACE_PLACEHOLDER: &str = "-";

/// Rendered in place of an unset entity id
pub const ID_WILDCARD: &str = "*";

/// Field name that addresses the record id in selectors and templates
pub const ID_FIELD: &str = "id";

/// Suffix marking control directives (`zone$`, `sort$`, ...)
pub const DIRECTIVE_SUFFIX: char = '$';

/// Default interval between shutdown completion polls
pub const SHUTDOWN_POLL_INTERVAL_MS_DEFAULT: u64 = 500;

/// Default number of extra polls before a best-effort close
pub const SHUTDOWN_RETRY_COUNT_MAX_DEFAULT: u32 = 10;

/// Upper bound on the shutdown poll interval accepted from configuration
pub const SHUTDOWN_POLL_INTERVAL_MS_MAX: u64 = 60_000;

/// Upper bound on the shutdown retry count accepted from configuration
pub const SHUTDOWN_RETRY_COUNT_MAX: u32 = 10_000;
