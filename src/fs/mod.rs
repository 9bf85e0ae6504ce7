//! Filesystem helpers for tablock.
//!
//! `link` holds the primitives the lock protocol is built from; `atomic`
//! rewrites the protected data file in the driver binary.

pub mod atomic;
pub mod link;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
pub use link::{create_owner_file, remove_quietly, same_file};
