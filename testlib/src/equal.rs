//! Deep-equality assertions.
//!
//! Every assertion first classifies both sides as nil or non-nil, then runs
//! the structural comparison. A failed assertion reports through the scope
//! and returns `Err`, so test bodies propagate it with `?`.

use std::fmt;

use testlib_core::{deep_diff, is_nil, render, Comparison, Inspect};

use crate::failure::{prefix, prefixf, Outcome};
use crate::scope::T;

/// Assert that `have` deep-equals `want`.
///
/// ```no_run
/// use testlib::{equal, Outcome, T};
///
/// fn body(t: &T) -> Outcome {
///     equal(t, &vec![1, 2, 3], &vec![1, 2, 3], &["parsed values"])
/// }
/// ```
#[track_caller]
pub fn equal(t: &T, have: &dyn Inspect, want: &dyn Inspect, desc: &[&str]) -> Outcome {
    check_equal(t, have, want, &[], &prefix(desc))
}

/// Like [`equal`] with a formatted description.
#[track_caller]
pub fn equalf(t: &T, have: &dyn Inspect, want: &dyn Inspect, args: fmt::Arguments<'_>) -> Outcome {
    check_equal(t, have, want, &[], &prefixf(args))
}

/// Like [`equal`], skipping the values at the given dotted paths.
#[track_caller]
pub fn equal_with_ignores(
    t: &T,
    have: &dyn Inspect,
    want: &dyn Inspect,
    ignores: &[&str],
    desc: &[&str],
) -> Outcome {
    check_equal(t, have, want, ignores, &prefix(desc))
}

/// Assert that `have` does not deep-equal `unwanted`.
///
/// Two nil values are rejected; a nil value against a non-nil one passes.
#[track_caller]
pub fn not_equal(t: &T, have: &dyn Inspect, unwanted: &dyn Inspect, desc: &[&str]) -> Outcome {
    check_not_equal(t, have, unwanted, &[], &prefix(desc))
}

#[track_caller]
pub fn not_equalf(
    t: &T,
    have: &dyn Inspect,
    unwanted: &dyn Inspect,
    args: fmt::Arguments<'_>,
) -> Outcome {
    check_not_equal(t, have, unwanted, &[], &prefixf(args))
}

/// Like [`not_equal`], skipping the values at the given dotted paths.
#[track_caller]
pub fn not_equal_with_ignores(
    t: &T,
    have: &dyn Inspect,
    unwanted: &dyn Inspect,
    ignores: &[&str],
    desc: &[&str],
) -> Outcome {
    check_not_equal(t, have, unwanted, ignores, &prefix(desc))
}

#[track_caller]
fn check_equal(
    t: &T,
    have: &dyn Inspect,
    want: &dyn Inspect,
    ignores: &[&str],
    prefix: &str,
) -> Outcome {
    match (is_nil(have), is_nil(want)) {
        (true, true) => return Ok(()),
        (true, false) => return t.fatal(format!("{}Expected non nil, got nil.", prefix)),
        (false, true) => return t.fatal(format!("{}Expected nil, got non nil.", prefix)),
        (false, false) => {}
    }

    let diff = Comparison::new()
        .ignoring(ignores.iter().copied())
        .diff(have, want);
    if diff.is_empty() {
        Ok(())
    } else {
        log::debug!("{} difference lines for {}", diff.len(), have.type_name());
        t.fatal(format!("{}Not Equal\n{}", prefix, diff))
    }
}

#[track_caller]
fn check_not_equal(
    t: &T,
    have: &dyn Inspect,
    unwanted: &dyn Inspect,
    ignores: &[&str],
    prefix: &str,
) -> Outcome {
    match (is_nil(have), is_nil(unwanted)) {
        (true, true) => return t.fatal(format!("{}Equality not expected, have=nil", prefix)),
        (true, false) | (false, true) => return Ok(()),
        (false, false) => {}
    }

    let diff = if ignores.is_empty() {
        deep_diff(have, unwanted)
    } else {
        Comparison::new()
            .ignoring(ignores.iter().copied())
            .diff(have, unwanted)
    };
    if diff.is_empty() {
        t.fatal(format!(
            "{}Values are not expected to be equal: {}",
            prefix,
            render(have)
        ))
    } else {
        Ok(())
    }
}
