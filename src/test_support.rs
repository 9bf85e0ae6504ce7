use crate::config::LockOptions;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A fresh directory holding a protected data file `mtab` containing "0".
pub(crate) fn create_test_target() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("mtab");
    std::fs::write(&target, "0").unwrap();
    (temp_dir, target)
}

/// Short deadline and a 1 ms poll so contention tests stay quick.
pub(crate) fn fast_options(max_wait_secs: u64) -> LockOptions {
    LockOptions::default()
        .with_max_wait_secs(max_wait_secs)
        .with_poll_interval_micros(1000)
}

/// Sorted file names in `dir`.
pub(crate) fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
