//! Atomic rewrite of the protected data file.
//!
//! The driver binary rewrites the table file while holding the lock. Writes go
//! through a temporary file in the same directory:
//! 1. Write content to `.{filename}.{pid}.tmp`
//! 2. Sync the file to disk (fsync)
//! 3. `rename()` it over the target, then sync the directory
//!
//! A crash leaves either the old or the new content, never a torn file. The
//! lock is still required: without it two writers lose each other's updates.

use crate::error::{LockError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path)?;

    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LockError::from_io(path, e)
    })?;

    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(non_empty_or_cwd(parent))
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Convenience wrapper around `atomic_write` for string content.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn non_empty_or_cwd(dir: &Path) -> &Path {
    if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    }
}

/// Temporary file path next to the target, unique per process.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let filename = target.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        LockError::InvalidArgument(format!("invalid file path '{}'", target.display()))
    })?;

    let temp_name = format!(".{}.{}.tmp", filename, std::process::id());
    Ok(match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| LockError::from_io(path, e))?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            LockError::from_io(path, e)
        })
}
