use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use testlib::watchdog::{self, WatchdogStatus};

/// Remove a temp directory once stdin reaches end-of-stream.
///
/// Start it with stdin connected to a pipe and keep the write end open for
/// as long as the directory is needed. Exit codes: 0 cleaned, 1 refused an
/// unsafe path, 2 failed reading stdin, 3 failed removing the directory.
#[derive(Parser)]
#[clap(version, author, about)]
pub struct Cli {
    /// Directory to remove
    pub dir: PathBuf,

    /// Directory the target must live strictly under [default: system temp dir]
    #[clap(long)]
    pub base: Option<PathBuf>,
}

fn try_main() -> Result<WatchdogStatus> {
    env_logger::init();
    // `testlib-watchdog <SENTINEL> <dir>` is also accepted.
    watchdog::intercept();

    let cli = Cli::parse();
    let dir = if cli.dir.is_absolute() {
        cli.dir
    } else {
        std::env::current_dir()
            .context("cannot resolve the working directory")?
            .join(cli.dir)
    };
    let base = cli.base.unwrap_or_else(std::env::temp_dir);

    log::debug!(
        "Watching {} (base {}) until stdin closes",
        dir.display(),
        base.display()
    );
    Ok(watchdog::run(&dir, &base, io::stdin().lock()))
}

fn main() {
    match try_main() {
        Ok(status) => ::std::process::exit(status.code()),
        Err(e) => {
            eprintln!("{e:?}");
            ::std::process::exit(WatchdogStatus::ReadFailed.code())
        }
    }
}
