//! # dbstream CLI Module
//!
//! Command-line driver over [`StreamStore`]: stores files as streams,
//! prints them back, probes ids and deletes ranges.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI Entry Point                        │
//! │                    (bin/dbstream.rs)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │               Cli / Command (clap derive)                   │
//! │  - opens one StreamStore from the global options            │
//! │  - dispatches to a command handler                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │        Commands              │          Report              │
//! │  write, read, lookup,        │  ReportVisitor prints one    │
//! │  delete, describe, demo      │  line per stream begin/end   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Store every file of a directory in a new database
//! dbstream --create ./streams.db write ./files
//!
//! # Print streams 10..=20
//! dbstream ./streams.db read --from 10 --to 20
//!
//! # Keep printing streams as other processes add them
//! dbstream ./streams.db read --follow
//!
//! # Delete everything and restart ids at 1
//! dbstream ./streams.db delete --all --reset-ids
//! ```

pub mod commands;
pub mod report;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use eyre::Result;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::stream::{KeyRange, RangeColumn};
use crate::StreamStore;

pub use report::ReportVisitor;

#[derive(Debug, Parser)]
#[command(name = "dbstream")]
#[command(version)]
#[command(about = "Store and read binary streams in a SQLite database", long_about = None)]
pub struct Cli {
    /// Database file
    pub database: PathBuf,

    /// Create the database file if it does not exist
    #[arg(short, long)]
    pub create: bool,

    /// Streams fetched per scan batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store files as streams; directories contribute their direct entries
    Write {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Map files into memory instead of reading them
        #[arg(long)]
        mmap: bool,

        /// Repeat the write, deleting everything between cycles
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },

    /// Print the streams of a range
    Read {
        #[command(flatten)]
        range: RangeArgs,

        /// Poll for new streams after the last one read
        #[arg(long)]
        follow: bool,

        /// Poll interval in follow mode
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Print the first and last streams and probe ids
    Lookup { ids: Vec<u64> },

    /// Delete the streams of a range
    Delete {
        #[command(flatten)]
        range: RangeArgs,

        /// Delete every stream
        #[arg(long)]
        all: bool,

        /// Restart ids at 1 (only with --all)
        #[arg(long)]
        reset_ids: bool,
    },

    /// Log the table layouts
    Describe,

    /// Run the full demonstration against a directory of files
    Demo {
        dir: PathBuf,

        /// One more file written through a memory map
        #[arg(long)]
        large_file: Option<PathBuf>,
    },
}

/// Range options shared by `read` and `delete`. A bound of 0 is open.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    #[arg(long, default_value_t = 0)]
    pub from: u64,

    #[arg(long, default_value_t = 0)]
    pub to: u64,

    #[arg(long)]
    pub exclusive_from: bool,

    #[arg(long)]
    pub exclusive_to: bool,

    /// `id` or `timestamp`
    #[arg(long, default_value = "id")]
    pub column: RangeColumn,
}

impl RangeArgs {
    pub fn key_range(&self) -> KeyRange {
        KeyRange::new(self.from, !self.exclusive_from, self.to, !self.exclusive_to)
    }
}

/// Opens the store named by `cli` and runs its command, printing to stdout.
pub fn run(cli: Cli) -> Result<()> {
    let mut store = StreamStore::builder()
        .path(&cli.database)
        .create_if_missing(cli.create)
        .batch_size(cli.batch_size)
        .open()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&mut store, cli.command, &mut out)?;
    out.flush()?;

    store.close()
}

/// Runs one command against an open store.
pub fn execute(store: &mut StreamStore, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Write { paths, mmap, cycles } => {
            for cycle in 0..cycles.max(1) {
                if cycle > 0 {
                    commands::delete(store, RangeColumn::Id, KeyRange::all(), true, false, out)?;
                }
                commands::write_paths(store, &paths, mmap, out)?;
            }
        }
        Command::Read {
            range,
            follow,
            interval_ms,
        } => {
            if follow {
                let start = range.from.saturating_sub(1);
                commands::follow(store, start, Duration::from_millis(interval_ms), None, out)?;
            } else {
                commands::read_range(store, range.column, range.key_range(), out)?;
            }
        }
        Command::Lookup { ids } => commands::lookup(store, &ids, out)?,
        Command::Delete {
            range,
            all,
            reset_ids,
        } => {
            commands::delete(store, range.column, range.key_range(), all, reset_ids, out)?;
        }
        Command::Describe => commands::describe(store, out)?,
        Command::Demo { dir, large_file } => {
            commands::demo(store, &dir, large_file.as_deref(), out)?
        }
    }
    Ok(())
}
