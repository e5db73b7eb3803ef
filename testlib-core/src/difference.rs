//! The difference record produced by a comparison.

use std::fmt;

/// Ordered, human-readable mismatch descriptions.
///
/// Each mismatch starts with a `path: message` line, usually followed by
/// indented `have:`/`want:` lines. An empty record means the values are
/// structurally equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Difference {
    lines: Vec<String>,
}

impl Difference {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines in the record.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The lines in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns true if any line contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    /// Join the lines into a single report.
    pub fn report(&self) -> String {
        self.lines.join("\n")
    }

    /// Consume the record, returning its lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl From<Vec<String>> for Difference {
    fn from(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

impl IntoIterator for Difference {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}
