//! The cleanup side of the temp root.
//!
//! A watchdog is this same program started as
//! `<program> <SENTINEL> <dir>` with its stdin connected to a pipe whose
//! write end stays in the parent. When the parent exits, for any reason, the
//! pipe reaches end-of-stream and the watchdog removes `dir`.
//!
//! Test binaries using the default libtest harness get the interception by
//! adding [`watchdog_hook!`](crate::watchdog_hook) at the crate root. The
//! sentinel doubles as a test-name filter, so the re-invoked test binary runs
//! only the hook.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use fs_err as fs;

/// First argument that turns a program into a watchdog.
pub const SENTINEL: &str = "__testlib_watchdog_q7f3k2";

/// File a watchdog creates in its directory once it is watching.
pub const READY_MARKER: &str = ".watchdog";

/// How a watchdog run ended. The discriminant is the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Heartbeat closed and the directory is gone.
    Cleaned = 0,
    /// The directory is not strictly inside the temp base; nothing was done.
    Unsafe = 1,
    /// Reading the heartbeat failed; nothing was removed.
    ReadFailed = 2,
    /// Removing the directory failed.
    RemoveFailed = 3,
}

impl WatchdogStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// The directory to watch if `args` is exactly `[program, SENTINEL, dir]`.
pub fn invocation<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    match args.as_slice() {
        [_, token, dir] if token == SENTINEL => Some(PathBuf::from(dir)),
        _ => None,
    }
}

/// Run the watchdog and exit if this process was started as one.
///
/// Call this first thing in `main`. Returns normally otherwise.
pub fn intercept() {
    if let Some(dir) = invocation(std::env::args_os()) {
        let status = run(&dir, &std::env::temp_dir(), io::stdin().lock());
        std::process::exit(status.code());
    }
}

/// Returns true if `dir` lies strictly below `base` with no `..` components.
pub fn is_safe(dir: &Path, base: &Path) -> bool {
    dir != base
        && dir.starts_with(base)
        && !dir.components().any(|c| matches!(c, Component::ParentDir))
}

/// Mark `dir` as watched, block until `heartbeat` reaches end-of-stream,
/// then remove `dir`.
///
/// Errors are written to stderr; the watchdog has no other channel back.
pub fn run(dir: &Path, base: &Path, mut heartbeat: impl Read) -> WatchdogStatus {
    if !is_safe(dir, base) {
        report(format_args!(
            "Refusing to clean a non temporary directory: {} since it is not under {}",
            dir.display(),
            base.display()
        ));
        return WatchdogStatus::Unsafe;
    }

    match fs::write(dir.join(READY_MARKER), std::process::id().to_string()) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => report(format_args!("Cannot mark {} as watched: {}", dir.display(), e)),
    }

    if let Err(e) = io::copy(&mut heartbeat, &mut io::sink()) {
        report(format_args!(
            "Error cleaning up directory {}: {}",
            dir.display(),
            e
        ));
        return WatchdogStatus::ReadFailed;
    }

    match fs::remove_dir_all(dir) {
        Ok(()) => {
            log::debug!("Removed temp root {}", dir.display());
            WatchdogStatus::Cleaned
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => WatchdogStatus::Cleaned,
        Err(e) => {
            report(format_args!("Error cleaning up directory: {}", e));
            WatchdogStatus::RemoveFailed
        }
    }
}

// The watchdog may be a libtest binary, which captures the print macros.
fn report(args: std::fmt::Arguments<'_>) {
    let _ = writeln!(io::stderr(), "{}", args);
}
