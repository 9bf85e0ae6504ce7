//! tablock: link-based cross-process locking for shared table files.
//!
//! The lock protects a file such as `/etc/mtab` that several independent
//! programs rewrite. It is compatible with the classic mtab locking scheme:
//! `<file>~` is the lock file, `<file>~.<pid>` the per-owner link file.
//!
//! ```no_run
//! use tablock::LockHandle;
//!
//! let mut lock = LockHandle::new("/etc/mtab")?;
//! lock.acquire()?;
//! // ... rewrite /etc/mtab ...
//! lock.release();
//! # Ok::<(), tablock::LockError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::LockOptions;
pub use error::{LockError, Result};
pub use locks::{LockHandle, LockStatus, clear_stale, probe};
