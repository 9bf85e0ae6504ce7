//! Locking of shared table files (e.g. `/etc/mtab`).
//!
//! The lock is backward compatible with the classic mtab locking scheme, so
//! every program that rewrites the same file must use this exact protocol.
//!
//! # Lock Files
//!
//! For a protected file `<path>`:
//! - `<path>~` is the lock file. Whoever creates it owns the lock.
//! - `<path>~.<id>` is the link file, one per owner (`<id>` defaults to the pid).
//!
//! # Locking Scheme
//!
//! 1. create the link file
//! 2. `link(<path>~.<id>, <path>~)`
//! 3. on success place a non-blocking `F_SETLK` record lock and return;
//!    on `EEXIST` wait (bounded) for the record lock, sleep, goto 2.
//!
//! `link(2)` is used instead of an exclusive create on the lock file itself:
//! with create-then-delete, a waiter could proceed after the owner deletes the
//! lock while a newcomer creates a fresh one, and both would write. Only the
//! process whose link succeeded ever deletes the lock file. The record lock is
//! in principle superfluous; it replaces an arbitrary sleep.
//!
//! # RAII
//!
//! `LockHandle` releases on drop. `release` is idempotent and may be called
//! whether or not the lock was ever acquired.

mod record;
mod status;


use record::WaitOutcome;
pub use status::{LockStatus, clear_stale, probe};

use crate::config::LockOptions;
use crate::error::{LockError, Result};
use crate::fs::{create_owner_file, remove_quietly, same_file};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// Suffix appended to the protected path to name the lock file.
pub const LOCK_SUFFIX: &str = "~";

/// `<target>~`
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// `<target>~.<owner_id>`
pub fn link_path_for(target: &Path, owner_id: u32) -> PathBuf {
    let mut name = lock_path_for(target).into_os_string();
    name.push(format!(".{}", owner_id));
    PathBuf::from(name)
}

/// Lock handle for one protected file.
#[derive(Debug)]
pub struct LockHandle {
    /// Shared lock file, e.g. `/etc/mtab~`.
    lock_path: PathBuf,

    /// Per-owner link file, e.g. `/etc/mtab~.1234`.
    link_path: PathBuf,

    /// Open lock file carrying the record lock.
    lock_file: Option<File>,

    /// Whether this handle won the link race.
    locked: bool,
}

impl LockHandle {
    /// Create a handle for `target` owned by the current process.
    pub fn new<P: AsRef<Path>>(target: P) -> Result<Self> {
        Self::create(target, None)
    }

    /// Create a handle for `target`.
    ///
    /// `owner_id` names the link file and defaults to the process id; `Some(0)`
    /// also means the process id. Threads of one process must each pass a
    /// distinct id. No I/O is performed.
    pub fn create<P: AsRef<Path>>(target: P, owner_id: Option<u32>) -> Result<Self> {
        let target = target.as_ref();
        if target.as_os_str().is_empty() {
            return Err(LockError::InvalidArgument(
                "target file path must not be empty".to_string(),
            ));
        }

        let owner_id = owner_id.filter(|&id| id != 0).unwrap_or_else(std::process::id);
        let handle = Self {
            lock_path: lock_path_for(target),
            link_path: link_path_for(target, owner_id),
            lock_file: None,
            locked: false,
        };

        debug!(
            lock = %handle.lock_path.display(),
            link = %handle.link_path.display(),
            "alloc"
        );
        Ok(handle)
    }

    /// Path to the shared lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Path to this owner's link file.
    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    /// Whether this handle currently owns the lock.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Descriptor of the open lock file, if any.
    pub fn lock_fd(&self) -> Option<RawFd> {
        self.lock_file.as_ref().map(|f| f.as_raw_fd())
    }

    /// Acquire the lock with the protocol defaults (30 s, 5000 µs).
    pub fn acquire(&mut self) -> Result<()> {
        self.acquire_with(&LockOptions::default())
    }

    /// Acquire the lock.
    ///
    /// Returns `LockError::Timeout` when the lock could not be taken before
    /// `options.max_wait()` elapsed, which usually means a stale lock file.
    /// On any error the handle is released before returning.
    pub fn acquire_with(&mut self, options: &LockOptions) -> Result<()> {
        if self.locked {
            return Ok(());
        }
        options.validate()?;

        match self.link_and_lock(options) {
            Ok(()) => {
                debug!(lock = %self.lock_path.display(), pid = std::process::id(), "successfully locked");
                remove_quietly(&self.link_path);
                Ok(())
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    fn link_and_lock(&mut self, options: &LockOptions) -> Result<()> {
        let started = Instant::now();
        let deadline = options.deadline_from(started)?;

        // Read-only or full filesystem, or out of descriptors: give up at once.
        create_owner_file(&self.link_path).map_err(|e| LockError::from_io(&self.link_path, e))?;

        while !self.locked {
            match fs::hard_link(&self.link_path, &self.lock_path) {
                Ok(()) => self.locked = true,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(LockError::from_io(&self.lock_path, e)),
            }

            let Some(file) = open_lock_file(&self.lock_path, deadline)? else {
                // The previous owner released between our link and open.
                self.locked = false;
                continue;
            };
            let file = self.lock_file.insert(file);

            if self.locked {
                // The link is what grants ownership; the record lock only
                // spares waiters a busy loop.
                match record::try_lock(file) {
                    Ok(true) => {}
                    Ok(false) => debug!(lock = %self.lock_path.display(), "record lock held by a waiter"),
                    Err(e) => debug!(lock = %self.lock_path.display(), error = %e, "can't F_SETLK lock file"),
                }
                break;
            }

            debug!(lock = %self.lock_path.display(), pid = std::process::id(), "waiting for record lock");
            let outcome = record::wait_lock(file, deadline, options.poll_interval())
                .map_err(|e| LockError::from_io(&self.lock_path, e))?;

            if wait_timed_out(outcome, Instant::now(), deadline) {
                warn!(
                    lock = %self.lock_path.display(),
                    "can't create link: time out (perhaps there is a stale lock file?)"
                );
                return Err(LockError::Timeout {
                    lock_path: self.lock_path.clone(),
                    waited: started.elapsed(),
                });
            }

            thread::sleep(options.poll_interval());
            self.lock_file = None;
        }

        Ok(())
    }

    /// Release the lock.
    ///
    /// Safe to call at any time, any number of times: the link file is always
    /// removed, the lock file only if this handle owns it. Never fails.
    pub fn release(&mut self) {
        // The ownership flag may be stale if we were interrupted right after
        // link() succeeded. We own the lock when link file == lock file.
        if !self.locked && same_file(&self.lock_path, &self.link_path) {
            self.locked = true;
        }

        debug!(
            lock = %self.lock_path.display(),
            pid = std::process::id(),
            "{}",
            if self.locked { "unlocking" } else { "cleaning" }
        );

        remove_quietly(&self.link_path);
        self.lock_file = None;
        if self.locked {
            remove_quietly(&self.lock_path);
        }

        self.locked = false;
    }
}

/// Open the lock file for writing.
///
/// `Ok(None)` means the file vanished before `deadline` and the caller should
/// retry the link; after the deadline a missing file is an error.
fn open_lock_file(lock_path: &Path, deadline: Instant) -> Result<Option<File>> {
    match OpenOptions::new().write(true).open(lock_path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound && Instant::now() < deadline => Ok(None),
        Err(e) => Err(LockError::from_io(lock_path, e)),
    }
}

/// Whether a record-lock wait that ended with `outcome` at `now` exhausts the
/// acquisition. An interrupted wait is only fatal once the deadline passed.
fn wait_timed_out(outcome: WaitOutcome, now: Instant, deadline: Instant) -> bool {
    match outcome {
        WaitOutcome::TimedOut => true,
        WaitOutcome::Interrupted => now >= deadline,
        WaitOutcome::Locked => false,
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release();
    }
}
