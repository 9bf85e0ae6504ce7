//! Error types for tablock.
//!
//! Uses thiserror for derive macros. OS failures keep the originating
//! `std::io::Error` so callers can still get at the raw errno.

use crate::exit_codes;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main error type for lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The caller passed an unusable argument (empty path, bad options).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// EACCES, EPERM or EROFS while touching a lock artifact.
    #[error("permission denied: '{}': {source}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// ENOSPC or EDQUOT while creating a lock artifact.
    #[error("no space left for '{}': {source}", .path.display())]
    NoSpace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// EMFILE or ENFILE.
    #[error("too many open files while opening '{}': {source}", .path.display())]
    TooManyOpenFiles {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The deadline passed while another owner held the lock.
    #[error(
        "timed out after {}s waiting for '{}' (perhaps there is a stale lock file?)",
        .waited.as_secs(),
        .lock_path.display()
    )]
    Timeout { lock_path: PathBuf, waited: Duration },

    /// Any other OS-level failure.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Driver-level failure: bad data file, refused operator action.
    #[error("{0}")]
    UserError(String),
}

impl LockError {
    /// Classify an OS error raised while operating on `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.raw_os_error() {
            Some(libc::EACCES) | Some(libc::EPERM) | Some(libc::EROFS) => {
                LockError::PermissionDenied { path, source }
            }
            Some(libc::ENOSPC) | Some(libc::EDQUOT) => LockError::NoSpace { path, source },
            Some(libc::EMFILE) | Some(libc::ENFILE) => LockError::TooManyOpenFiles { path, source },
            _ => LockError::Io { path, source },
        }
    }

    /// The errno behind this error, if it came from the OS.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            LockError::PermissionDenied { source, .. }
            | LockError::NoSpace { source, .. }
            | LockError::TooManyOpenFiles { source, .. }
            | LockError::Io { source, .. } => source.raw_os_error(),
            LockError::Timeout { .. } => Some(libc::ETIMEDOUT),
            LockError::InvalidArgument(_) => Some(libc::EINVAL),
            LockError::UserError(_) => None,
        }
    }

    /// True for `Timeout`, which callers should report as a possible stale lock.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::InvalidArgument(_) => exit_codes::USER_ERROR,
            LockError::UserError(_) => exit_codes::USER_ERROR,
            LockError::PermissionDenied { .. }
            | LockError::NoSpace { .. }
            | LockError::TooManyOpenFiles { .. }
            | LockError::Io { .. } => exit_codes::IO_FAILURE,
            LockError::Timeout { .. } => exit_codes::LOCK_TIMEOUT,
        }
    }
}

/// Result type alias for tablock operations.
pub type Result<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn os_error(code: i32) -> LockError {
        LockError::from_io(Path::new("/etc/mtab~"), io::Error::from_raw_os_error(code))
    }

    #[test]
    fn permission_errors_are_classified() {
        assert!(matches!(os_error(libc::EACCES), LockError::PermissionDenied { .. }));
        assert!(matches!(os_error(libc::EPERM), LockError::PermissionDenied { .. }));
        assert!(matches!(os_error(libc::EROFS), LockError::PermissionDenied { .. }));
    }

    #[test]
    fn resource_errors_are_classified() {
        assert!(matches!(os_error(libc::ENOSPC), LockError::NoSpace { .. }));
        assert!(matches!(os_error(libc::EMFILE), LockError::TooManyOpenFiles { .. }));
        assert!(matches!(os_error(libc::ENFILE), LockError::TooManyOpenFiles { .. }));
    }

    #[test]
    fn other_errors_fall_back_to_io() {
        let err = os_error(libc::ENOENT);
        assert!(matches!(err, LockError::Io { .. }));
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn os_error_code_is_preserved() {
        assert_eq!(os_error(libc::EACCES).raw_os_error(), Some(libc::EACCES));
        assert_eq!(os_error(libc::ENOSPC).raw_os_error(), Some(libc::ENOSPC));
    }

    #[test]
    fn timeout_mentions_stale_lock_file() {
        let err = LockError::Timeout {
            lock_path: PathBuf::from("/etc/mtab~"),
            waited: Duration::from_secs(30),
        };
        assert!(err.is_timeout());
        assert_eq!(err.raw_os_error(), Some(libc::ETIMEDOUT));
        let message = err.to_string();
        assert!(message.contains("/etc/mtab~"));
        assert!(message.contains("stale lock file"));
        assert!(message.contains("30s"));
    }

    #[test]
    fn errors_have_correct_exit_codes() {
        assert_eq!(
            LockError::InvalidArgument("empty".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            LockError::UserError("bad data".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(os_error(libc::EACCES).exit_code(), exit_codes::IO_FAILURE);
        assert_eq!(os_error(libc::EIO).exit_code(), exit_codes::IO_FAILURE);
        let timeout = LockError::Timeout {
            lock_path: PathBuf::from("x~"),
            waited: Duration::from_secs(1),
        };
        assert_eq!(timeout.exit_code(), exit_codes::LOCK_TIMEOUT);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = LockError::InvalidArgument("empty target path".to_string());
        assert_eq!(err.to_string(), "invalid argument: empty target path");

        let err = os_error(libc::EACCES);
        assert!(err.to_string().starts_with("permission denied: '/etc/mtab~'"));
    }
}
