//! Assertions about `Result` values.
//!
//! Each helper hands back the useful half of the result so a test can keep
//! going with it: `expect_success` yields the value, `expect_error` the error.

use std::fmt::{self, Debug, Display};

use crate::failure::{prefix, prefixf, Outcome};
use crate::scope::T;

/// Fail the test unless `result` is an error; returns the error.
#[track_caller]
pub fn expect_error<V, E>(t: &T, result: Result<V, E>, desc: &[&str]) -> Outcome<E> {
    missing_error(t, result, &prefix(desc))
}

#[track_caller]
pub fn expect_errorf<V, E>(t: &T, result: Result<V, E>, args: fmt::Arguments<'_>) -> Outcome<E> {
    missing_error(t, result, &prefixf(args))
}

/// Fail the test if `result` is an error; returns the value.
///
/// ```no_run
/// use testlib::{expect_success, Outcome, T};
///
/// fn body(t: &T) -> Outcome {
///     let n: u16 = expect_success(t, "8080".parse::<u16>(), &["port"])?;
///     assert_eq!(n, 8080);
///     Ok(())
/// }
/// ```
#[track_caller]
pub fn expect_success<V, E>(t: &T, result: Result<V, E>, desc: &[&str]) -> Outcome<V>
where
    E: Debug + Display,
{
    unexpected_error(t, result, &prefix(desc))
}

#[track_caller]
pub fn expect_successf<V, E>(t: &T, result: Result<V, E>, args: fmt::Arguments<'_>) -> Outcome<V>
where
    E: Debug + Display,
{
    unexpected_error(t, result, &prefixf(args))
}

/// Fail the test unless `result` is an error whose message contains
/// `needle`; returns the error.
#[track_caller]
pub fn expect_error_message<V, E>(
    t: &T,
    result: Result<V, E>,
    needle: &str,
    desc: &[&str],
) -> Outcome<E>
where
    E: Display,
{
    let prefix = prefix(desc);
    match result {
        Ok(_) => t.fatal(format!("{}Expected error was not returned.", prefix)),
        Err(e) => {
            let message = e.to_string();
            if message.contains(needle) {
                Ok(e)
            } else {
                t.fatal(format!(
                    "{}Error message didn't contain the expected message:\n\
                     Error message={}\nExpected string={}",
                    prefix, message, needle
                ))
            }
        }
    }
}

#[track_caller]
fn missing_error<V, E>(t: &T, result: Result<V, E>, prefix: &str) -> Outcome<E> {
    match result {
        Err(e) => Ok(e),
        Ok(_) => t.fatal(format!("{}Error not returned when one was expected.", prefix)),
    }
}

#[track_caller]
fn unexpected_error<V, E>(t: &T, result: Result<V, E>, prefix: &str) -> Outcome<V>
where
    E: Debug + Display,
{
    match result {
        Ok(v) => Ok(v),
        Err(e) => t.fatal(format!(
            "{}Unexpected error encountered: {:?} ({})",
            prefix, e, e
        )),
    }
}
