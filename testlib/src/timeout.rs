//! Bounded polling.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crate::failure::{prefix, prefixf, Outcome};
use crate::scope::T;

/// Call `predicate` until it returns true, failing the test once `timeout`
/// has elapsed.
///
/// The thread yields between polls since the predicate may not block.
#[track_caller]
pub fn try_until<F>(t: &T, predicate: F, timeout: Duration, desc: &[&str]) -> Outcome
where
    F: FnMut() -> bool,
{
    if poll(predicate, timeout) {
        Ok(())
    } else {
        t.fatal(format!("{}Timeout after {:?}", prefix(desc), timeout))
    }
}

#[track_caller]
pub fn try_untilf<F>(t: &T, predicate: F, timeout: Duration, args: fmt::Arguments<'_>) -> Outcome
where
    F: FnMut() -> bool,
{
    if poll(predicate, timeout) {
        Ok(())
    } else {
        t.fatal(format!("{}Timeout after {:?}", prefixf(args), timeout))
    }
}

fn poll<F: FnMut() -> bool>(mut predicate: F, timeout: Duration) -> bool {
    let end = Instant::now() + timeout;
    while Instant::now() < end {
        if predicate() {
            return true;
        }
        thread::yield_now();
    }
    false
}
