//! Inspection of a lock file, for acting on a `Timeout`.
//!
//! A lock file that exists while no other process holds its record lock was
//! most likely left behind by a crashed owner. Note that `F_GETLK` cannot see
//! locks of the calling process, and that probing from a process that owns the
//! lock drops its record lock (closing any descriptor on the inode does).

use super::{lock_path_for, record};
use crate::error::{LockError, Result};
use crate::fs::remove_quietly;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Snapshot of the on-disk lock state for one protected file.
#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    /// The lock file path (`<target>~`).
    pub lock_path: PathBuf,

    /// Whether the lock file exists.
    pub exists: bool,

    /// Inode of the lock file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inode: Option<u64>,

    /// Hard link count (2 while the owner's link file still exists).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<u64>,

    /// Last modification of the lock file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// Pid of another process holding the record lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_pid: Option<u32>,

    /// Link files (`<target>~.<id>`) found next to the lock file.
    pub leftover_links: Vec<PathBuf>,
}

impl LockStatus {
    /// The lock file exists but nobody else holds its record lock.
    pub fn is_stale(&self) -> bool {
        self.exists && self.holder_pid.is_none()
    }

    /// Time since the lock file was last modified.
    pub fn age(&self) -> Option<Duration> {
        self.modified
            .map(|modified| Utc::now().signed_duration_since(modified))
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> Option<String> {
        let age = self.age()?;
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        Some(if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds.max(0))
        })
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.exists {
            return write!(f, "{} (unlocked)", self.lock_path.display());
        }

        write!(f, "{} (", self.lock_path.display())?;
        match self.holder_pid {
            Some(pid) => write!(f, "held by pid {}", pid)?,
            None => write!(f, "no record lock holder, STALE")?,
        }
        if let Some(age) = self.age_string() {
            write!(f, ", age: {}", age)?;
        }
        write!(f, ")")
    }
}

/// Inspect the lock state of `target` without taking the lock.
pub fn probe<P: AsRef<Path>>(target: P) -> Result<LockStatus> {
    let target = target.as_ref();
    if target.as_os_str().is_empty() {
        return Err(LockError::InvalidArgument(
            "target file path must not be empty".to_string(),
        ));
    }

    let lock_path = lock_path_for(target);
    let mut status = LockStatus {
        lock_path: lock_path.clone(),
        exists: false,
        inode: None,
        links: None,
        modified: None,
        holder_pid: None,
        leftover_links: find_link_files(&lock_path)?,
    };

    let file = match File::open(&lock_path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(status),
        Err(e) => return Err(LockError::from_io(&lock_path, e)),
    };
    let meta = file
        .metadata()
        .map_err(|e| LockError::from_io(&lock_path, e))?;

    status.exists = true;
    status.inode = Some(meta.ino());
    status.links = Some(meta.nlink());
    status.modified = meta.modified().ok().map(DateTime::<Utc>::from);
    status.holder_pid = record::holder(&file).map_err(|e| LockError::from_io(&lock_path, e))?;

    Ok(status)
}

/// Remove a stale lock file and leftover link files of `target`.
///
/// This is an operator action and bypasses the ownership rule, so it refuses
/// to touch a lock file whose record lock is held by another process. Returns
/// the state observed before clearing.
pub fn clear_stale<P: AsRef<Path>>(target: P) -> Result<LockStatus> {
    let status = probe(target)?;

    if !status.exists {
        return Err(LockError::UserError(format!(
            "lock file '{}' does not exist",
            status.lock_path.display()
        )));
    }

    if let Some(pid) = status.holder_pid {
        return Err(LockError::UserError(format!(
            "lock file '{}' is held by pid {}; refusing to clear it",
            status.lock_path.display(),
            pid
        )));
    }

    fs::remove_file(&status.lock_path).map_err(|e| LockError::from_io(&status.lock_path, e))?;
    for link in &status.leftover_links {
        remove_quietly(link);
    }

    Ok(status)
}

/// Link files `<lock_path>.<numeric id>` in the lock file's directory.
fn find_link_files(lock_path: &Path) -> Result<Vec<PathBuf>> {
    let dir = match lock_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(prefix) = lock_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| format!("{}.", n))
    else {
        return Ok(Vec::new());
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LockError::from_io(dir, e)),
    };

    let mut links = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LockError::from_io(dir, e))?;
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(|n| n.strip_prefix(prefix.as_str())) else {
            continue;
        };
        if id.parse::<u32>().is_ok() {
            links.push(lock_path.with_file_name(&name));
        }
    }

    links.sort();
    Ok(links)
}
