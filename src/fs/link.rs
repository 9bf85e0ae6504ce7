//! Primitives for the link-based lock protocol.
//!
//! The protocol relies on three properties of POSIX filesystems:
//! - `link(2)` fails with `EEXIST` when the destination already exists, so
//!   exactly one contender can create the shared lock file;
//! - two directory entries are the same file iff device and inode match;
//! - unlinking a missing file is harmless to everybody else.

use std::fs::{self, OpenOptions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::Path;

/// Owner-only read/write, no group or other access.
pub const OWNER_ONLY_MODE: u32 = 0o600;

/// Create `path` as an empty owner-only file (or open an existing one) and
/// close it immediately.
///
/// Existing content is left alone; the file only serves as the source of a
/// hard link.
pub fn create_owner_file(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(OWNER_ONLY_MODE)
        .open(path)
        .map(drop)
}

/// True when both paths exist and name the same inode on the same device.
///
/// Any stat failure counts as "not the same file".
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

/// Unlink `path`, ignoring every error. Returns whether something was removed.
pub fn remove_quietly(path: &Path) -> bool {
    fs::remove_file(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_owner_file_is_empty_and_private() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mtab~.42");

        create_owner_file(&path).unwrap();

        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), 0);
        assert_eq!(meta.mode() & 0o777, OWNER_ONLY_MODE);
    }

    #[test]
    fn test_create_owner_file_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mtab~.42");
        fs::write(&path, "leftover").unwrap();

        create_owner_file(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "leftover");
    }

    #[test]
    fn test_create_owner_file_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("mtab~.42");

        let err = create_owner_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_same_file_detects_hard_links() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("mtab~.1");
        let lock = temp_dir.path().join("mtab~");
        let other = temp_dir.path().join("mtab~.2");

        create_owner_file(&link).unwrap();
        create_owner_file(&other).unwrap();
        fs::hard_link(&link, &lock).unwrap();

        assert!(same_file(&link, &lock));
        assert!(!same_file(&other, &lock));
    }

    #[test]
    fn test_same_file_with_missing_path_is_false() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present");
        create_owner_file(&present).unwrap();

        assert!(!same_file(&present, &temp_dir.path().join("absent")));
        assert!(!same_file(&temp_dir.path().join("absent"), &present));
    }

    #[test]
    fn test_remove_quietly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mtab~.7");
        create_owner_file(&path).unwrap();

        assert!(remove_quietly(&path));
        assert!(!path.exists());
        assert!(!remove_quietly(&path));
    }
}
