//! The per-test scope.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::failure::{Failure, Outcome};
use crate::root::TempRoot;
use crate::sink::{thread_test_name, LibtestSink, OutcomeSink};
use crate::trace::annotate;

/// Name used when no test name can be resolved.
const FALLBACK_NAME: &str = "testlib";

type Finalizer = Box<dyn FnOnce()>;

/// State owned by a single running test.
///
/// Failures are reported to an [`OutcomeSink`]. Aborting is done by returning
/// the `Err` produced by [`fatal`](T::fatal) or [`skip`](T::skip). Finalizers
/// run in reverse registration order when [`finish`](T::finish) is called or
/// the scope is dropped.
///
/// ```no_run
/// use testlib::{equal, Outcome, T};
///
/// fn body(t: &T) -> Outcome {
///     let path = t.write_temp_file("a,b\n1,2\n")?;
///     let text = std::fs::read_to_string(&path).unwrap();
///     equal(t, &text.lines().count(), &2_usize, &["line count"])
/// }
///
/// T::run(body).unwrap();
/// ```
pub struct T {
    sink: Arc<dyn OutcomeSink>,
    name: OnceCell<String>,
    skipped: Cell<bool>,
    finalizers: RefCell<Vec<Finalizer>>,
    root: Option<Arc<TempRoot>>,
}

impl T {
    /// A scope reporting to libtest, using the process-wide temp root.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LibtestSink::new()))
    }

    pub fn with_sink(sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            sink,
            name: OnceCell::new(),
            skipped: Cell::new(false),
            finalizers: RefCell::new(Vec::new()),
            root: None,
        }
    }

    /// Use `root` instead of the process-wide temp root.
    pub fn with_root(mut self, root: Arc<TempRoot>) -> Self {
        self.root = Some(root);
        self
    }

    /// Fix the test name instead of resolving it.
    pub fn named(self, name: impl Into<String>) -> Self {
        // A fresh cell cannot already be set.
        let _ = self.name.set(name.into());
        self
    }

    /// Run `body` in a fresh scope.
    ///
    /// Finalizers run once the body returns. A skip is logged and counts as
    /// success; a fatal failure is returned as-is.
    pub fn run<F>(body: F) -> Outcome
    where
        F: FnOnce(&T) -> Outcome,
    {
        T::new().enter(body)
    }

    /// Run `body` against this scope, then finish it.
    pub fn enter<F>(self, body: F) -> Outcome
    where
        F: FnOnce(&T) -> Outcome,
    {
        let result = body(&self);
        self.finish();
        match result {
            Err(Failure::Skipped { message }) => {
                log::debug!("{} skipped: {}", self.name(), message);
                Ok(())
            }
            other => other,
        }
    }

    /// Name of the running test, resolved once.
    ///
    /// Resolution order: explicit name, the sink, the current thread's name,
    /// then `"testlib"`.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| {
            self.sink
                .test_name()
                .or_else(thread_test_name)
                .unwrap_or_else(|| FALLBACK_NAME.to_string())
        })
    }

    /// Register `f` to run when the scope finishes.
    pub fn add_finalizer(&self, f: impl FnOnce() + 'static) {
        self.finalizers.borrow_mut().push(Box::new(f));
    }

    /// Run the registered finalizers, most recent first.
    ///
    /// Finalizers registered while finishing also run.
    pub fn finish(&self) {
        loop {
            let next = self.finalizers.borrow_mut().pop();
            match next {
                Some(f) => f(),
                None => break,
            }
        }
    }

    /// Report a failure and keep going.
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.sink
            .fail(&annotate(Location::caller(), &message.to_string()));
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.sink.fail(&annotate(Location::caller(), &args.to_string()));
    }

    /// Report a failure and return the abort for the caller to propagate.
    ///
    /// ```
    /// # use testlib::{Outcome, T};
    /// fn check(t: &T, n: u32) -> Outcome {
    ///     if n == 0 {
    ///         return t.fatal("n must be positive");
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[track_caller]
    pub fn fatal<U>(&self, message: impl fmt::Display) -> Outcome<U> {
        let message = annotate(Location::caller(), &message.to_string());
        self.sink.fatal(&message);
        Err(Failure::Fatal { message })
    }

    #[track_caller]
    pub fn fatalf<U>(&self, args: fmt::Arguments<'_>) -> Outcome<U> {
        self.fatal(args)
    }

    /// Stop the test as skipped.
    #[track_caller]
    pub fn skip<U>(&self, message: impl fmt::Display) -> Outcome<U> {
        let message = annotate(Location::caller(), &message.to_string());
        self.sink.skip(&message);
        self.skipped.set(true);
        Err(Failure::Skipped { message })
    }

    #[track_caller]
    pub fn skipf<U>(&self, args: fmt::Arguments<'_>) -> Outcome<U> {
        self.skip(args)
    }

    pub fn log(&self, message: impl fmt::Display) {
        self.sink.log(&message.to_string());
    }

    pub fn logf(&self, args: fmt::Arguments<'_>) {
        self.sink.log(&args.to_string());
    }

    pub fn failed(&self) -> bool {
        self.sink.failed()
    }

    pub fn skipped(&self) -> bool {
        self.skipped.get()
    }

    /// The temp root for this scope, initializing the process-wide one on
    /// first use.
    #[track_caller]
    pub(crate) fn temp_root(&self) -> Outcome<Arc<TempRoot>> {
        match &self.root {
            Some(root) => Ok(Arc::clone(root)),
            None => crate::expect::expect_success(self, TempRoot::global(), &["temp root"]),
        }
    }
}

impl Default for T {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for T {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("T")
            .field("name", &self.name.get())
            .field("finalizers", &self.finalizers.borrow().len())
            .field("failed", &self.failed())
            .finish()
    }
}

impl Drop for T {
    fn drop(&mut self) {
        self.finish();
    }
}
