//! POSIX record locks (`fcntl(2)` `F_SETLK` / `F_GETLK`) on the lock file.
//!
//! Record locks are only a wait-avoidance layer on top of the link protocol:
//! a contender blocks here instead of spinning on `link(2)`. They belong to the
//! process, so threads of one process never conflict with each other, and
//! closing *any* descriptor on the inode drops the process's locks on it.
//!
//! A blocking `F_SETLKW` cannot be bounded without a process-wide SIGALRM
//! handler, so `wait_lock` polls `F_SETLK` against a deadline instead.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::{Duration, Instant};

/// How a bounded record-lock wait ended without an OS error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The record lock is now held by this process.
    Locked,
    /// The lock call was interrupted by a signal.
    Interrupted,
    /// The deadline passed before the lock became available.
    TimedOut,
}

/// Longest sleep between two record-lock attempts while waiting.
const RECHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Exclusive lock over the whole file: start 0, length 0 (to EOF and beyond).
fn whole_file_write_lock() -> libc::flock {
    // SAFETY: flock is a plain C struct; all-zero is a valid value.
    let mut fl: libc::flock = unsafe { std::mem::zeroed() };
    fl.l_type = libc::F_WRLCK as _;
    fl.l_whence = libc::SEEK_SET as _;
    fl.l_start = 0;
    fl.l_len = 0;
    fl
}

fn is_contended(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EAGAIN) | Some(libc::EACCES))
}

/// Try to place an exclusive whole-file write lock without blocking.
///
/// Returns `Ok(false)` when another process holds a conflicting lock.
pub fn try_lock(file: &File) -> io::Result<bool> {
    let fl = whole_file_write_lock();
    // SAFETY: the descriptor is owned by `file` and `fl` outlives the call.
    let ret = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLK, &fl as *const libc::flock) };
    if ret == 0 {
        return Ok(true);
    }

    let err = io::Error::last_os_error();
    if is_contended(&err) { Ok(false) } else { Err(err) }
}

/// Wait for an exclusive whole-file write lock until `deadline`.
///
/// Sleeps the shorter of `poll` and one millisecond between attempts (never
/// past the deadline), so a released lock is noticed almost at once. OS errors
/// other than contention and `EINTR` are returned as-is.
pub fn wait_lock(file: &File, deadline: Instant, poll: Duration) -> io::Result<WaitOutcome> {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome::TimedOut);
        }

        match try_lock(file) {
            Ok(true) => return Ok(WaitOutcome::Locked),
            Ok(false) => thread::sleep(poll.min(RECHECK_INTERVAL).min(deadline - now)),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                return Ok(WaitOutcome::Interrupted);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Pid of a process holding a lock that conflicts with a whole-file write
/// lock, if any.
///
/// Locks held by the calling process never conflict and are not reported.
pub fn holder(file: &File) -> io::Result<Option<u32>> {
    let mut fl = whole_file_write_lock();
    // SAFETY: F_GETLK writes into `fl`, which is a valid, exclusive borrow.
    let ret = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETLK, &mut fl as *mut libc::flock) };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }

    if i32::from(fl.l_type) == libc::F_UNLCK as i32 {
        Ok(None)
    } else {
        Ok(u32::try_from(fl.l_pid).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::TempDir;

    fn open_rw(temp_dir: &TempDir) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(temp_dir.path().join("mtab~"))
            .unwrap()
    }

    #[test]
    fn test_try_lock_free_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = open_rw(&temp_dir);

        assert!(try_lock(&file).unwrap());
    }

    #[test]
    fn test_same_process_locks_do_not_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let first = open_rw(&temp_dir);
        let second = open_rw(&temp_dir);

        assert!(try_lock(&first).unwrap());
        assert!(try_lock(&second).unwrap());
        assert_eq!(holder(&second).unwrap(), None);
    }

    #[test]
    fn test_wait_lock_returns_locked_when_free() {
        let temp_dir = TempDir::new().unwrap();
        let file = open_rw(&temp_dir);
        let deadline = Instant::now() + Duration::from_secs(1);

        let outcome = wait_lock(&file, deadline, Duration::from_millis(5)).unwrap();
        assert_eq!(outcome, WaitOutcome::Locked);
    }

    #[test]
    fn test_wait_lock_past_deadline_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let file = open_rw(&temp_dir);

        let outcome = wait_lock(&file, Instant::now(), Duration::from_millis(5)).unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[test]
    fn test_try_lock_on_read_only_descriptor_fails() {
        let temp_dir = TempDir::new().unwrap();
        drop(open_rw(&temp_dir));
        let read_only = File::open(temp_dir.path().join("mtab~")).unwrap();

        // A write lock needs a descriptor opened for writing.
        let err = try_lock(&read_only).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }
}
