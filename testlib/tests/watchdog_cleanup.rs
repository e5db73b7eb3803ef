//! Temp root cleanup that needs a whole process.
//!
//! Runs without the libtest harness: this binary is also the watchdog and the
//! abruptly terminated child.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fs_err as fs;
use testlib::{TempRoot, T};

const CHILD_ARG: &str = "--abrupt-child";

fn main() {
    testlib::watchdog::intercept();
    let _ = env_logger::builder().is_test(true).try_init();

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some(CHILD_ARG) {
        abrupt_child(Path::new(&args[2]));
    }

    concurrent_first_use_creates_one_root();
    abrupt_exit_still_cleans_up();
    println!("watchdog_cleanup: ok");
}

/// Create temp resources, report the root, then die without finalizers.
fn abrupt_child(report: &Path) -> ! {
    let t = T::new().named("abrupt_child");
    let root = t.root_temp_dir().expect("temp root");
    t.write_temp_file("left behind").expect("temp file");
    fs::write(report, root.to_string_lossy().as_bytes()).expect("report root");
    std::process::abort();
}

fn concurrent_first_use_creates_one_root() {
    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| TempRoot::global().expect("global root")))
        .collect();
    let roots: Vec<Arc<TempRoot>> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    let first = &roots[0];
    for root in &roots[1..] {
        assert!(Arc::ptr_eq(first, root));
        assert_eq!(root.watchdog_pid(), first.watchdog_pid());
    }
    assert!(first.path().is_dir());
}

fn abrupt_exit_still_cleans_up() {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let report = scratch.path().join("root.txt");

    let status = Command::new(std::env::current_exe().expect("current exe"))
        .arg(CHILD_ARG)
        .arg(&report)
        .stdout(Stdio::null())
        .status()
        .expect("spawn child");
    assert!(!status.success(), "child should die abnormally");

    let root = PathBuf::from(fs::read_to_string(&report).expect("child report"));
    assert!(root.starts_with(std::env::temp_dir()));

    let deadline = Instant::now() + Duration::from_secs(30);
    while root.exists() {
        assert!(
            Instant::now() < deadline,
            "temp root {} survived its process",
            root.display()
        );
        thread::sleep(Duration::from_millis(20));
    }
}
