//! CLI argument parsing for tablock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tablock::LockOptions;
use tablock::config::{MAX_WAIT_SECS, POLL_INTERVAL_MICROS};

/// tablock: cross-process locking for shared table files.
///
/// Drives and inspects the `<file>~` / `<file>~.<pid>` lock used by programs
/// that rewrite files such as /etc/mtab.
#[derive(Parser, Debug)]
#[command(name = "tablock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for tablock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Increment a number in a data file under the lock.
    ///
    /// Each loop locks the file, reads the number, writes it back plus one
    /// and unlocks. Run many instances in parallel to check the lock.
    Increment(IncrementArgs),

    /// Acquire the lock and hold it for a while.
    ///
    /// Prints `locked <lock file>` once the lock is owned. Ctrl-C releases
    /// early.
    Hold(HoldArgs),

    /// Show the state of a lock file.
    ///
    /// Reports the record lock holder and leftover link files, and flags a
    /// lock file nobody holds as stale.
    Status(StatusArgs),

    /// Remove a stale lock file.
    ///
    /// Refuses while another process holds the record lock.
    Clear(ClearArgs),

    /// Print the lock and link file paths for a target file.
    Paths(PathsArgs),
}

/// Acquisition tuning shared by commands that take the lock.
#[derive(Args, Debug, Clone, Copy)]
pub struct LockArgs {
    /// Maximum seconds to wait for the lock.
    #[arg(long, default_value_t = MAX_WAIT_SECS)]
    pub max_wait: u64,

    /// Sleep between attempts, in microseconds.
    #[arg(long, default_value_t = POLL_INTERVAL_MICROS)]
    pub poll_interval: u64,
}

impl LockArgs {
    pub fn options(&self) -> LockOptions {
        LockOptions::default()
            .with_max_wait_secs(self.max_wait)
            .with_poll_interval_micros(self.poll_interval)
    }
}

/// Arguments for the `increment` command.
#[derive(Parser, Debug)]
pub struct IncrementArgs {
    /// Unix time (seconds) at which to start, to line up parallel runs.
    #[arg(long)]
    pub synctime: Option<i64>,

    /// Report every increment on stderr.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub lock: LockArgs,

    /// File holding the number.
    pub datafile: PathBuf,

    /// Number of lock/increment/unlock loops.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub loops: u32,
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Seconds to hold the lock.
    #[arg(long, default_value_t = 10)]
    pub seconds: u64,

    /// Link file id (defaults to the process id).
    #[arg(long)]
    pub owner_id: Option<u32>,

    #[command(flatten)]
    pub lock: LockArgs,

    /// File to lock.
    pub target: PathBuf,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON.
    #[arg(long)]
    pub json: bool,

    /// Protected file.
    pub target: PathBuf,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Actually remove the lock file.
    #[arg(long)]
    pub force: bool,

    /// Protected file.
    pub target: PathBuf,
}

/// Arguments for the `paths` command.
#[derive(Parser, Debug)]
pub struct PathsArgs {
    /// Link file id (defaults to the process id).
    #[arg(long)]
    pub owner_id: Option<u32>,

    /// Protected file.
    pub target: PathBuf,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
