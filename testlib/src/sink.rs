//! Where test outcomes go.
//!
//! [`LibtestSink`] reports through the standard test harness. [`MemorySink`]
//! records events so helpers built on this crate can assert on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

/// Receiver of a test's failures, skips and log lines.
///
/// A fatal report only records the failure; stopping the test is done by the
/// caller returning `Err(Failure)`.
pub trait OutcomeSink: Send + Sync {
    /// Record a failure and keep running.
    fn fail(&self, message: &str);

    /// Record a failure that is about to abort the test.
    fn fatal(&self, message: &str);

    /// Record that the test is about to stop as skipped.
    fn skip(&self, message: &str);

    fn log(&self, message: &str);

    /// Returns true once any failure has been recorded.
    fn failed(&self) -> bool;

    /// Name of the running test, if the sink knows it.
    fn test_name(&self) -> Option<String>;
}

/// Reports to libtest's captured output.
///
/// libtest runs each test on a thread named after the test's path, which is
/// where the test name comes from.
#[derive(Debug, Default)]
pub struct LibtestSink {
    failed: AtomicBool,
}

impl LibtestSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeSink for LibtestSink {
    fn fail(&self, message: &str) {
        self.failed.store(true, Ordering::SeqCst);
        eprintln!("{}", message);
    }

    // libtest prints the `Err` the test returns, which carries the message.
    fn fatal(&self, _message: &str) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn skip(&self, message: &str) {
        println!("SKIP: {}", message);
    }

    fn log(&self, message: &str) {
        println!("{}", message);
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn test_name(&self) -> Option<String> {
        thread_test_name()
    }
}

/// The last path segment of the current thread's name, unless it is `main`.
pub(crate) fn thread_test_name() -> Option<String> {
    let current = thread::current();
    let full = current.name()?;
    if full == "main" {
        return None;
    }
    full.rsplit("::").next().map(str::to_string)
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Fail(String),
    Fatal(String),
    Skip(String),
    Log(String),
}

impl Event {
    pub fn message(&self) -> &str {
        match self {
            Event::Fail(m) | Event::Fatal(m) | Event::Skip(m) | Event::Log(m) => m,
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    name: Option<String>,
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that reports `name` as the test name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the recorded events in order.
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Messages of recorded failures, fatal or not.
    pub fn failures(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| matches!(e, Event::Fail(_) | Event::Fatal(_)))
            .map(|e| e.message().to_string())
            .collect()
    }

    fn push(&self, event: Event) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl OutcomeSink for MemorySink {
    fn fail(&self, message: &str) {
        self.push(Event::Fail(message.to_string()));
    }

    fn fatal(&self, message: &str) {
        self.push(Event::Fatal(message.to_string()));
    }

    fn skip(&self, message: &str) {
        self.push(Event::Skip(message.to_string()));
    }

    fn log(&self, message: &str) {
        self.push(Event::Log(message.to_string()));
    }

    fn failed(&self) -> bool {
        self.lock()
            .iter()
            .any(|e| matches!(e, Event::Fail(_) | Event::Fatal(_)))
    }

    fn test_name(&self) -> Option<String> {
        self.name.clone()
    }
}
