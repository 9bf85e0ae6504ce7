//! Implementation of the `tablock hold` command.
//!
//! Keeps the lock for a fixed time so other processes (or an operator) can
//! observe contention. The lock is released on timeout and on Ctrl-C.

use crate::cli::HoldArgs;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tablock::LockHandle;
use tablock::error::{LockError, Result};
use tracing::info;

/// How often the hold loop checks for Ctrl-C.
const TICK: Duration = Duration::from_millis(50);

/// Execute the `tablock hold` command.
pub fn cmd_hold(args: HoldArgs) -> Result<()> {
    let running = install_ctrlc_handler()?;

    let mut lock = LockHandle::create(&args.target, args.owner_id)?;
    lock.acquire_with(&args.lock.options())?;

    println!("locked {}", lock.lock_path().display());
    let _ = std::io::stdout().flush();
    info!(lock = %lock.lock_path().display(), seconds = args.seconds, "holding");

    let until = Instant::now()
        .checked_add(Duration::from_secs(args.seconds))
        .ok_or_else(|| {
            LockError::InvalidArgument(format!(
                "hold time of {} seconds is out of range",
                args.seconds
            ))
        })?;
    while running.load(Ordering::SeqCst) && Instant::now() < until {
        thread::sleep(TICK);
    }

    lock.release();
    // Whoever waited for "locked" may have closed our stdout by now.
    let _ = writeln!(std::io::stdout(), "released {}", lock.lock_path().display());
    Ok(())
}

// Install Ctrl-C handler and return a shared run flag.
// The hold loop polls this flag so the lock is released before exiting.
fn install_ctrlc_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_for_signal = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_signal.store(false, Ordering::SeqCst);
    })
    .map_err(|e| LockError::UserError(format!("installing Ctrl-C handler failed: {}", e)))?;
    Ok(running)
}
