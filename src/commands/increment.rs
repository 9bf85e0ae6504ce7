//! Implementation of the `tablock increment` command.
//!
//! Reads a number from the data file, increments it and writes it back, each
//! time under the lock. Started from many processes at once, the final number
//! equals the total number of loops only if the lock serializes the writers.

use crate::cli::IncrementArgs;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tablock::LockHandle;
use tablock::error::{LockError, Result};
use tablock::fs::atomic_write_file;
use tracing::info;

/// Pause after each loop when synchronized, like a mount finishing its work
/// after the table update.
const SYNC_PAUSE: Duration = Duration::from_millis(25);

/// Execute the `tablock increment` command.
pub fn cmd_increment(args: IncrementArgs) -> Result<()> {
    let options = args.lock.options();
    options.validate()?;

    let pid = std::process::id();
    info!(
        pid,
        datafile = %args.datafile.display(),
        loops = args.loops,
        synctime = ?args.synctime,
        "start"
    );

    if let Some(synctime) = args.synctime {
        wait_until(synctime)?;
    }

    for loop_no in 0..args.loops {
        let mut lock = LockHandle::new(&args.datafile)?;
        lock.acquire_with(&options)?;

        let (old, new) = increment_data(&args.datafile)?;
        if args.verbose {
            eprintln!(
                "{}: {}: {} --> {} (loop={})",
                pid,
                args.datafile.display(),
                old,
                new,
                loop_no
            );
        }

        lock.release();

        if args.synctime.is_some() {
            thread::sleep(SYNC_PAUSE);
        }
    }

    Ok(())
}

/// Sleep until the given Unix time, if it is still ahead.
fn wait_until(synctime: i64) -> Result<()> {
    let start = DateTime::<Utc>::from_timestamp(synctime, 0)
        .ok_or_else(|| LockError::InvalidArgument(format!("invalid synctime {}", synctime)))?;

    if let Ok(delay) = start.signed_duration_since(Utc::now()).to_std() {
        thread::sleep(delay);
    }
    Ok(())
}

/// Increment the number stored in `path`, returning the old and new values.
pub(crate) fn increment_data(path: &Path) -> Result<(i64, i64)> {
    let content = std::fs::read_to_string(path).map_err(|e| LockError::from_io(path, e))?;

    let first_line = content.lines().next().unwrap_or("").trim();
    let old: i64 = first_line.parse().map_err(|_| {
        LockError::UserError(format!(
            "data file '{}' does not start with a number (found '{}')",
            path.display(),
            first_line
        ))
    })?;

    let new = old.checked_add(1).ok_or_else(|| {
        LockError::UserError(format!("data file '{}' counter would overflow", path.display()))
    })?;
    atomic_write_file(path, &new.to_string())?;
    Ok((old, new))
}
