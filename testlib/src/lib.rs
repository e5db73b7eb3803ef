//! Unit-testing support.
//!
//! A test body receives a [`T`] scope and returns an [`Outcome`]. Assertions
//! report through the scope and return `Err` to abort only the current test:
//!
//! ```no_run
//! use std::collections::HashMap;
//! use testlib::{equal, expect_success, Outcome, T};
//!
//! fn counts_words(t: &T) -> Outcome {
//!     let path = t.write_temp_file("a b a")?;
//!     let text = expect_success(t, std::fs::read_to_string(&path), &["reading input"])?;
//!
//!     let mut counts = HashMap::new();
//!     for word in text.split_whitespace() {
//!         *counts.entry(word).or_insert(0) += 1;
//!     }
//!     let want: HashMap<&str, i32> = [("a", 2), ("b", 1)].into_iter().collect();
//!     equal(t, &counts, &want, &["word counts"])
//! }
//!
//! T::run(counts_words).unwrap();
//! ```
//!
//! # Temp files
//!
//! [`T::temp_dir`], [`T::temp_file`] and [`T::write_temp_file`] create
//! resources under a process-wide temp root. The root is removed by a
//! watchdog process even when the test process is killed. The watchdog is
//! the test binary itself, so a test crate using the default harness must
//! install the hook once at its root:
//!
//! ```ignore
//! testlib::watchdog_hook!();
//! ```
//!
//! Binaries with their own `main` call [`watchdog::intercept`] first instead,
//! or set `TESTLIB_WATCHDOG` to the `testlib-watchdog` executable.
//! Without any of these the watchdog never reports ready and creating the
//! temp root fails the test.

pub mod equal;
pub mod expect;
pub mod failure;
pub mod files;
pub mod root;
pub mod scope;
pub mod sink;
pub mod timeout;
mod trace;
pub mod watchdog;

pub use testlib_core;
pub use testlib_core::{inspect_struct, Difference, Inspect, Kind, Nil};

pub use equal::{equal, equal_with_ignores, equalf, not_equal, not_equal_with_ignores, not_equalf};
pub use expect::{
    expect_error, expect_error_message, expect_errorf, expect_success, expect_successf,
};
pub use failure::{Failure, Outcome};
pub use root::{RootConfig, RootError, TempRoot};
pub use scope::T;
pub use sink::{LibtestSink, MemorySink, OutcomeSink};
pub use timeout::{try_until, try_untilf};

/// Define the test that turns a re-invoked libtest binary into a watchdog.
///
/// Use once at the root of each test crate that creates temp files.
#[macro_export]
macro_rules! watchdog_hook {
    () => {
        #[test]
        fn __testlib_watchdog_q7f3k2() {
            $crate::watchdog::intercept();
        }
    };
}

#[cfg(test)]
watchdog_hook!();
