//! The process-scoped temp root.
//!
//! One directory per test process, created on first use and removed by a
//! watchdog child once the process is gone. See [`crate::watchdog`] for the
//! child's side of the protocol.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use fs_err as fs;

use crate::watchdog::{READY_MARKER, SENTINEL};

/// Environment variable naming the watchdog program.
pub const PROGRAM_ENV: &str = "TESTLIB_WATCHDOG";
/// Environment variable overriding the temp root name prefix.
pub const PREFIX_ENV: &str = "TESTLIB_PREFIX";

pub const DEFAULT_PREFIX: &str = "rust-testlib";
pub const ROOT_MODE: u32 = 0o777;
/// How long a new watchdog has to report ready.
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL: Duration = Duration::from_millis(5);

/// How to create a temp root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    /// Program started with `<SENTINEL> <dir>` as the watchdog.
    pub program: PathBuf,
    /// Name prefix of the root directory.
    pub prefix: String,
    /// Permission bits applied to the root directory.
    pub mode: u32,
    /// How long to wait for the watchdog's ready marker.
    pub ready_timeout: Duration,
}

impl RootConfig {
    /// Read `TESTLIB_WATCHDOG` and `TESTLIB_PREFIX`.
    ///
    /// Without `TESTLIB_WATCHDOG` the current executable watches itself.
    pub fn from_env() -> Result<Self, RootError> {
        let program = match std::env::var_os(PROGRAM_ENV) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => std::env::current_exe().map_err(RootError::CurrentExe)?,
        };
        let prefix = std::env::var(PREFIX_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        Ok(Self {
            program,
            prefix,
            mode: ROOT_MODE,
            ready_timeout: READY_TIMEOUT,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RootError {
    #[error("cannot locate the current executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("cannot create temp root: {0}")]
    Create(#[source] io::Error),

    #[error("cannot set temp root permissions: {0}")]
    Permissions(#[source] io::Error),

    #[error("cannot start watchdog {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watchdog started without a heartbeat pipe")]
    NoHeartbeat,

    /// Usually a test crate missing `watchdog_hook!()`.
    #[error("watchdog {} exited before it was ready ({status}); is `testlib::watchdog_hook!()` installed?", program.display())]
    WatchdogExited { program: PathBuf, status: ExitStatus },

    #[error("watchdog {} was not ready after {timeout:?}", program.display())]
    WatchdogTimeout { program: PathBuf, timeout: Duration },

    #[error("cannot poll watchdog: {0}")]
    Poll(#[source] io::Error),

    /// The process-wide root failed to initialize earlier.
    #[error("temp root is unavailable: {0}")]
    Unavailable(String),
}

/// A temp directory whose removal is guaranteed by a watchdog process.
///
/// The heartbeat is the write end of the watchdog's stdin. It is closed when
/// this value drops or, for the process-wide root, when the process exits.
#[derive(Debug)]
pub struct TempRoot {
    path: PathBuf,
    pid: u32,
    heartbeat: Option<ChildStdin>,
    watchdog: Option<Child>,
}

static GLOBAL: OnceLock<Result<Arc<TempRoot>, String>> = OnceLock::new();

impl TempRoot {
    /// Create the directory and start its watchdog.
    pub fn create(config: &RootConfig) -> Result<Self, RootError> {
        let path = tempfile::Builder::new()
            .prefix(&config.prefix)
            .tempdir()
            .map_err(RootError::Create)?
            .keep();

        match Self::watch(path.clone(), config) {
            Ok(root) => Ok(root),
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&path) {
                    log::warn!("Leaking temp root: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    fn watch(path: PathBuf, config: &RootConfig) -> Result<Self, RootError> {
        set_mode(&path, config.mode).map_err(RootError::Permissions)?;

        let mut command = Command::new(&config.program);
        command
            .arg(SENTINEL)
            .arg(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        detach(&mut command);

        let mut child = command.spawn().map_err(|source| RootError::Spawn {
            program: config.program.clone(),
            source,
        })?;
        let Some(heartbeat) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RootError::NoHeartbeat);
        };
        if let Err(e) = await_ready(&mut child, &path, config) {
            drop(heartbeat);
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        log::debug!(
            "Temp root {} watched by {} (pid {})",
            path.display(),
            config.program.display(),
            child.id()
        );
        Ok(Self {
            path,
            pid: child.id(),
            heartbeat: Some(heartbeat),
            watchdog: Some(child),
        })
    }

    /// The process-wide root, created on first call from [`RootConfig::from_env`].
    ///
    /// Concurrent first callers block until the one initializer finishes. A
    /// failed initialization is not retried.
    pub fn global() -> Result<Arc<TempRoot>, RootError> {
        GLOBAL
            .get_or_init(|| {
                RootConfig::from_env()
                    .and_then(|config| TempRoot::create(&config))
                    .map(Arc::new)
                    .map_err(|e| {
                        log::warn!("Temp root initialization failed: {}", e);
                        e.to_string()
                    })
            })
            .clone()
            .map_err(RootError::Unavailable)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn watchdog_pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        // End-of-stream on the watchdog's stdin starts the cleanup.
        drop(self.heartbeat.take());
        if let Some(mut child) = self.watchdog.take() {
            match child.wait() {
                Ok(status) => log::debug!("Watchdog {} exited: {}", self.pid, status),
                Err(e) => log::warn!("Cannot reap watchdog {}: {}", self.pid, e),
            }
        }
    }
}

/// Wait for the watchdog to drop its ready marker into `path`.
fn await_ready(child: &mut Child, path: &Path, config: &RootConfig) -> Result<(), RootError> {
    let marker = path.join(READY_MARKER);
    let deadline = Instant::now() + config.ready_timeout;
    loop {
        if marker.exists() {
            return Ok(());
        }
        if let Some(status) = child.try_wait().map_err(RootError::Poll)? {
            return Err(RootError::WatchdogExited {
                program: config.program.clone(),
                status,
            });
        }
        if Instant::now() >= deadline {
            return Err(RootError::WatchdogTimeout {
                program: config.program.clone(),
                timeout: config.ready_timeout,
            });
        }
        thread::sleep(READY_POLL);
    }
}

#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    log::debug!("Setting permissions {:o} on {}", mode, path.display());
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Keep terminal signals aimed at the parent's group away from the watchdog.
#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RootConfig {
        RootConfig {
            program: std::env::current_exe().unwrap(),
            prefix: "testlib-root-test".into(),
            mode: ROOT_MODE,
            ready_timeout: READY_TIMEOUT,
        }
    }

    #[test]
    fn dropping_the_root_removes_it() {
        let root = TempRoot::create(&config()).unwrap();
        let path = root.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("testlib-root-test"));
        assert!(path.join(READY_MARKER).is_file());
        fs::write(path.join("data.bin"), [1, 2, 3]).unwrap();

        drop(root);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn root_is_world_writable() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempRoot::create(&config()).unwrap();
        let mode = fs::metadata(root.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[test]
    fn spawn_failure_removes_the_directory() {
        let config = RootConfig {
            program: PathBuf::from("/nonexistent/testlib-watchdog"),
            prefix: "testlib-spawn-failure".into(),
            mode: ROOT_MODE,
            ready_timeout: READY_TIMEOUT,
        };
        let err = TempRoot::create(&config).unwrap_err();
        assert!(matches!(err, RootError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/testlib-watchdog"));

        assert!(!leaked("testlib-spawn-failure"));
    }

    fn leaked(prefix: &str) -> bool {
        fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(Result::ok)
            .any(|e| e.file_name().to_string_lossy().starts_with(prefix))
    }

    // A program that exits without the handshake stands in for a test
    // binary that never installed the hook.
    #[cfg(unix)]
    #[test]
    fn watchdog_that_exits_early_is_an_error() {
        let config = RootConfig {
            program: PathBuf::from("true"),
            prefix: "testlib-early-exit".into(),
            mode: ROOT_MODE,
            ready_timeout: READY_TIMEOUT,
        };
        let err = TempRoot::create(&config).unwrap_err();
        assert!(matches!(err, RootError::WatchdogExited { .. }), "{}", err);
        assert!(err.to_string().contains("watchdog_hook!()"));
        assert!(!leaked("testlib-early-exit"));
    }

    #[cfg(unix)]
    #[test]
    fn silent_watchdog_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let script = bin.path().join("silent-watchdog");
        fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = RootConfig {
            program: script,
            prefix: "testlib-silent".into(),
            mode: ROOT_MODE,
            ready_timeout: Duration::from_millis(100),
        };
        let err = TempRoot::create(&config).unwrap_err();
        assert!(matches!(err, RootError::WatchdogTimeout { .. }), "{}", err);
        assert!(!leaked("testlib-silent"));
    }

    // The watchdog is this libtest binary; its banner must not reach the
    // parent's stdout.
    #[test]
    fn watchdog_keeps_quiet_on_stdout() {
        let output = Command::new(std::env::current_exe().unwrap())
            .args(["--exact", "root::tests::dropping_the_root_removes_it"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.matches("running 1 test").count(), 1, "{}", stdout);
    }

    #[test]
    fn global_root_is_shared() {
        let a = TempRoot::global().unwrap();
        let b = TempRoot::global().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.path().is_dir());
        assert_ne!(a.watchdog_pid(), std::process::id());
    }
}
