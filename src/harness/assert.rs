//! Non-panicking assertion macros for steps.
//!
//! Both macros `return` an `Err(SuiteError::Assertion(..))` from the
//! enclosing function, so they only work inside functions returning
//! `StepResult` (or any `Result<_, SuiteError>`).

/// Fail the step unless `cond` holds.
///
/// ```ignore
/// check!(saved.id().is_some());
/// check!(list.len() >= 2, "expected at least two foos, got {}", list.len());
/// ```
#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        $crate::check!($cond, "{}", stringify!($cond))
    };
    ($cond:expr, $($fmt:tt)+) => {
        if !$cond {
            return Err($crate::SuiteError::from($crate::AssertionViolation::new(
                format!($($fmt)+),
                file!(),
                line!(),
            )));
        }
    };
}

/// Fail the step unless `left == right`, reporting both values.
#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::check_eq!($left, $right, "{} == {}", stringify!($left), stringify!($right))
    };
    ($left:expr, $right:expr, $($fmt:tt)+) => {
        match (&$left, &$right) {
            (left, right) => {
                if !(*left == *right) {
                    return Err($crate::SuiteError::from($crate::AssertionViolation::new(
                        format!("{}: left {:?}, right {:?}", format!($($fmt)+), left, right),
                        file!(),
                        line!(),
                    )));
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{SuiteError, StepResult};

    fn positive(n: i64) -> StepResult {
        crate::check!(n > 0);
        Ok(())
    }

    fn same(a: &str, b: &str) -> StepResult {
        crate::check_eq!(a, b, "labels differ");
        Ok(())
    }

    #[test]
    fn test_check_passes_and_fails() {
        assert!(positive(1).is_ok());
        match positive(-1) {
            Err(SuiteError::Assertion(violation)) => {
                assert_eq!(violation.message, "n > 0");
                assert!(violation.file.ends_with("assert.rs"));
            }
            other => panic!("expected assertion, got {other:?}"),
        }
    }

    #[test]
    fn test_check_eq_reports_both_sides() {
        assert!(same("a", "a").is_ok());
        let Err(SuiteError::Assertion(violation)) = same("a", "b") else {
            panic!("expected assertion");
        };
        assert_eq!(violation.message, r#"labels differ: left "a", right "b""#);
    }
}
