//! Harness - Scenario Runner and Fixture State
//!
//! TigerStyle: Strict ordering, first failure aborts, errors surface unchanged.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Suite<F>                                                    │
//! │    [Setup]  remove all$ in every declared namespace          │
//! │    step 1 ─→ step 2 ─→ ... ─→ step N   (abort on first Err)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  StepContext<F>: store, settings, fixture F (fresh per run)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteReport: StepRecord per step, Option<SuiteFailure>      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps are plain `async fn`s over `&mut StepContext<F>` registered as
//! `|ctx| Box::pin(step(ctx))`. Assertions use [`check!`](crate::check) and
//! [`check_eq!`](crate::check_eq), which return an `AssertionViolation`
//! from the step instead of panicking.

mod assert;
mod error;
pub mod fixture;
mod report;
mod runner;

pub use error::{AssertionViolation, SuiteError};
pub use report::{StepOutcome, StepRecord, SuiteFailure, SuiteReport};
pub use runner::{Step, StepContext, StepFn, StepResult, Suite};

/// Category label for the namespace-clearing setup phase
pub const SETUP_CATEGORY: &str = "[Setup]";
