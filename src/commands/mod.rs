//! Command implementations for tablock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod hold;
mod increment;
mod status;

use crate::cli::{ClearArgs, Command, PathsArgs};
use tablock::error::{LockError, Result};
use tablock::{LockHandle, clear_stale};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Increment(args) => increment::cmd_increment(args),
        Command::Hold(args) => hold::cmd_hold(args),
        Command::Status(args) => status::cmd_status(args),
        Command::Clear(args) => cmd_clear(args),
        Command::Paths(args) => cmd_paths(args),
    }
}

fn cmd_clear(args: ClearArgs) -> Result<()> {
    if !args.force {
        return Err(LockError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock file while its owner is still running lets two writers\n\
             modify the table at once. Only clear it if the owner has crashed.\n\n\
             To clear the lock, run:\n  tablock clear {} --force",
            args.target.display()
        )));
    }

    let cleared = clear_stale(&args.target)?;

    println!("Cleared lock: {}", cleared.lock_path.display());
    if let Some(age) = cleared.age_string() {
        println!("  Age:        {}", age);
    }
    for link in &cleared.leftover_links {
        println!("  Removed:    {}", link.display());
    }

    Ok(())
}

fn cmd_paths(args: PathsArgs) -> Result<()> {
    let handle = LockHandle::create(&args.target, args.owner_id)?;
    println!("lock: {}", handle.lock_path().display());
    println!("link: {}", handle.link_path().display());
    Ok(())
}
