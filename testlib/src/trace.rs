//! Caller location and call-chain trace for failure messages.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::Location;

/// Symbol prefixes of frames that are noise in a failure trace.
const INTERNAL: &[&str] = &["testlib::", "testlib_core::", "std::backtrace"];

/// Prefix `message` with the caller location and append the call chain
/// without this library's own frames.
///
/// The chain is captured regardless of `RUST_BACKTRACE`, so an assertion made
/// inside a helper still shows the line that called the helper.
pub(crate) fn annotate(location: &Location<'_>, message: &str) -> String {
    let mut out = format!("{}:{}: {}", location.file(), location.line(), message);
    let backtrace = Backtrace::force_capture();
    if backtrace.status() == BacktraceStatus::Captured {
        let frames = filter_frames(&backtrace.to_string());
        if !frames.is_empty() {
            out.push('\n');
            out.push_str(&frames);
        }
    }
    out
}

/// Drop frames whose symbol belongs to this library, keeping its tests.
///
/// A rendered frame is a numbered symbol line followed by optional indented
/// `at file:line` lines.
fn filter_frames(rendered: &str) -> String {
    let mut kept = Vec::new();
    let mut skipping = false;
    for line in rendered.lines() {
        let trimmed = line.trim_start();
        if let Some(symbol) = frame_symbol(trimmed) {
            skipping = is_internal(symbol);
        }
        if !skipping {
            kept.push(line);
        }
    }
    kept.join("\n")
}

fn frame_symbol(line: &str) -> Option<&str> {
    let (index, rest) = line.split_once(':')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}

fn is_internal(symbol: &str) -> bool {
    INTERNAL.iter().any(|p| symbol.starts_with(p)) && !symbol.contains("::tests::")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = "   0: std::backtrace::Backtrace::capture
             at /rustc/library/std/src/backtrace.rs:296:9
   1: testlib::trace::annotate
             at ./src/trace.rs:14:21
   2: testlib::equal::equal
             at ./src/equal.rs:40:5
   3: my_crate::tests::loads_config
             at ./src/lib.rs:88:9
   4: core::ops::function::FnOnce::call_once";

    #[test]
    fn library_frames_are_removed() {
        let filtered = filter_frames(RENDERED);
        assert!(!filtered.contains("testlib::"));
        assert!(!filtered.contains("std::backtrace"));
        assert!(filtered.contains("my_crate::tests::loads_config"));
        assert!(filtered.contains("./src/lib.rs:88:9"));
        assert!(filtered.contains("FnOnce::call_once"));
    }

    #[test]
    fn library_tests_are_kept() {
        assert!(!is_internal("testlib::equal::tests::strings"));
        assert!(is_internal("testlib_core::engine::Comparison::diff"));
    }

    #[test]
    fn location_leads_the_message() {
        let location = Location::caller();
        let text = annotate(location, "boom");
        assert!(text.starts_with(&format!("{}:{}: boom", location.file(), location.line())));
    }
}
