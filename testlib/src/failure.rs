//! The abort model: a failed or skipped test is an `Err(Failure)` that the
//! test body propagates with `?`.

use std::fmt;

/// Why the current test stopped early.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// The test failed and must not continue.
    #[error("{message}")]
    Fatal { message: String },

    /// The test chose not to run to completion.
    #[error("skipped: {message}")]
    Skipped { message: String },
}

impl Failure {
    /// The message without the variant decoration.
    pub fn message(&self) -> &str {
        match self {
            Failure::Fatal { message } | Failure::Skipped { message } => message,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Failure::Skipped { .. })
    }
}

// libtest prints the `Debug` form of an `Err` returned from a test.
impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Result of a test body or of any assertion inside one.
pub type Outcome<T = ()> = Result<T, Failure>;

/// Join description parts into a message prefix: `"a b: "`, or nothing.
pub(crate) fn prefix(desc: &[&str]) -> String {
    if desc.is_empty() {
        String::new()
    } else {
        format!("{}: ", desc.join(" "))
    }
}

/// Prefix built from a formatted description.
pub(crate) fn prefixf(args: fmt::Arguments<'_>) -> String {
    format!("{}: ", args)
}
