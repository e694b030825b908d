//! Fixture State - typed carryover between steps
//!
//! Each suite defines its own `Default` fixture struct of `Option` slots.
//! A step that depends on an earlier step reads its slot through
//! [`require`] so a missing value fails the step instead of panicking.

use std::panic::Location;

use super::error::{AssertionViolation, SuiteError};

/// Borrow a slot filled by an earlier step.
///
/// # Errors
/// `SuiteError::Assertion` naming the slot when it is empty.
#[track_caller]
pub fn require<'a, T>(slot: &'a Option<T>, name: &str) -> Result<&'a T, SuiteError> {
    let caller = Location::caller();
    slot.as_ref().ok_or_else(|| missing(name, caller))
}

/// Mutably borrow a slot filled by an earlier step.
///
/// # Errors
/// `SuiteError::Assertion` naming the slot when it is empty.
#[track_caller]
pub fn require_mut<'a, T>(slot: &'a mut Option<T>, name: &str) -> Result<&'a mut T, SuiteError> {
    let caller = Location::caller();
    slot.as_mut().ok_or_else(|| missing(name, caller))
}

/// Unwrap a lookup result that the contract says must exist.
///
/// # Errors
/// `SuiteError::Assertion` naming `what` when the lookup came back empty.
#[track_caller]
pub fn found<T>(result: Option<T>, what: &str) -> Result<T, SuiteError> {
    let caller = Location::caller();
    result.ok_or_else(|| {
        AssertionViolation::new(format!("{what} was not found"), caller.file(), caller.line())
            .into()
    })
}

fn missing(name: &str, caller: &'static Location<'static>) -> SuiteError {
    AssertionViolation::new(
        format!("fixture `{name}` was not set by an earlier step"),
        caller.file(),
        caller.line(),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_slot_name() {
        let empty: Option<u8> = None;
        let Err(SuiteError::Assertion(violation)) = require(&empty, "foo1") else {
            panic!("expected assertion");
        };
        assert!(violation.message.contains("foo1"));
        assert!(violation.file.ends_with("fixture.rs"));

        let mut full = Some(3u8);
        *require_mut(&mut full, "n").unwrap() += 1;
        assert_eq!(require(&full, "n").unwrap(), &4);
    }
}
