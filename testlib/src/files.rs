//! Per-test temp files and directories.
//!
//! Everything is created under the scope's temp root, named after the test,
//! and removed by a finalizer when the scope finishes. If the process dies
//! first, the watchdog removes the whole root.

use std::io::Write;
use std::path::PathBuf;

use fs_err as fs;

use crate::expect::expect_success;
use crate::failure::Outcome;
use crate::root::set_mode;
use crate::scope::T;

pub const DEFAULT_DIR_MODE: u32 = 0o755;
pub const DEFAULT_FILE_MODE: u32 = 0o644;

impl T {
    /// The process-wide temp root directory, shared by every test.
    #[track_caller]
    pub fn root_temp_dir(&self) -> Outcome<PathBuf> {
        Ok(self.temp_root()?.path().to_path_buf())
    }

    /// A fresh directory with mode `0o755`.
    #[track_caller]
    pub fn temp_dir(&self) -> Outcome<PathBuf> {
        self.temp_dir_mode(DEFAULT_DIR_MODE)
    }

    #[track_caller]
    pub fn temp_dir_mode(&self, mode: u32) -> Outcome<PathBuf> {
        let root = self.temp_root()?;
        let created = tempfile::Builder::new()
            .prefix(&self.file_prefix())
            .tempdir_in(root.path());
        let dir = expect_success(self, created, &["creating temp dir"])?.keep();

        let target = dir.clone();
        self.add_finalizer(move || {
            if let Err(e) = fs::remove_dir_all(&target) {
                log::debug!("Temp dir already gone: {}", e);
            }
        });
        expect_success(self, set_mode(&dir, mode), &["setting temp dir mode"])?;
        Ok(dir)
    }

    /// A fresh, open file with mode `0o644`.
    #[track_caller]
    pub fn temp_file(&self) -> Outcome<fs::File> {
        self.temp_file_mode(DEFAULT_FILE_MODE)
    }

    #[track_caller]
    pub fn temp_file_mode(&self, mode: u32) -> Outcome<fs::File> {
        let root = self.temp_root()?;
        let created = tempfile::Builder::new()
            .prefix(&self.file_prefix())
            .tempfile_in(root.path());
        let named = expect_success(self, created, &["creating temp file"])?;
        let (file, path) = expect_success(self, named.keep(), &["keeping temp file"])?;

        let target = path.clone();
        self.add_finalizer(move || {
            if let Err(e) = fs::remove_file(&target) {
                log::debug!("Temp file already gone: {}", e);
            }
        });
        expect_success(self, set_mode(&path, mode), &["setting temp file mode"])?;
        Ok(fs::File::from_parts(file, path))
    }

    /// A closed file with mode `0o644` holding `contents`; returns its path.
    #[track_caller]
    pub fn write_temp_file(&self, contents: impl AsRef<[u8]>) -> Outcome<PathBuf> {
        self.write_temp_file_mode(contents, DEFAULT_FILE_MODE)
    }

    #[track_caller]
    pub fn write_temp_file_mode(&self, contents: impl AsRef<[u8]>, mode: u32) -> Outcome<PathBuf> {
        let mut file = self.temp_file_mode(mode)?;
        let path = file.path().to_path_buf();
        expect_success(self, file.write_all(contents.as_ref()), &["writing temp file"])?;
        expect_success(self, file.flush(), &["writing temp file"])?;
        Ok(path)
    }

    /// The test name reduced to characters safe in a file name.
    fn file_prefix(&self) -> String {
        self.name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}
