//! Implementation of the `tablock status` command.

use crate::cli::StatusArgs;
use tablock::error::{LockError, Result};
use tablock::{LockStatus, probe};

/// Execute the `tablock status` command.
pub fn cmd_status(args: StatusArgs) -> Result<()> {
    let status = probe(&args.target)?;

    if args.json {
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| LockError::UserError(format!("failed to serialize lock status: {}", e)))?;
        println!("{}", json);
    } else {
        print_status(&status);
    }

    Ok(())
}

fn print_status(status: &LockStatus) {
    println!("Lock file:  {}", status.lock_path.display());

    if !status.exists {
        println!("State:      unlocked");
    } else {
        match status.holder_pid {
            Some(pid) => println!("State:      held by pid {}", pid),
            None => println!("State:      STALE (no process holds the record lock)"),
        }
        if let Some(inode) = status.inode {
            println!("Inode:      {}", inode);
        }
        if let Some(links) = status.links {
            println!("Links:      {}", links);
        }
        if let Some(modified) = status.modified {
            println!("Modified:   {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if let Some(age) = status.age_string() {
            println!("Age:        {}", age);
        }
    }

    if !status.leftover_links.is_empty() {
        println!();
        println!("Leftover link files ({}):", status.leftover_links.len());
        for link in &status.leftover_links {
            println!("  - {}", link.display());
        }
    }

    if status.is_stale() {
        println!();
        println!(
            "Note: the lock file looks stale. Use `tablock clear --force <file>` to remove it."
        );
    }
}
