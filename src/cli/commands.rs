//! # Command Handlers
//!
//! One function per CLI command. Each takes the open store and an output
//! writer, so the commands can be exercised against an in-memory buffer.
//!
//! ## Supported Commands
//!
//! | Command     | Description                                             |
//! |-------------|---------------------------------------------------------|
//! | `write`     | Store regular files (directories: their direct entries) |
//! | `read`      | Print every stream of a range, optionally following     |
//! | `lookup`    | Print first/last streams and probe ids                  |
//! | `delete`    | Delete a range, or everything with `--all`              |
//! | `describe`  | Log the table layouts                                   |
//! | `demo`      | Describe, lookup, write, read, lookup, delete, lookup   |
//!
//! Write failures of single files are reported and skipped; the error
//! itself has already gone to the store's diagnostic sink.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;

use super::report::{description_for, now_millis, type_class, ReportVisitor};
use crate::stream::{KeyRange, RangeColumn, ScanSummary, StreamHeader};
use crate::StreamStore;

/// Ids probed by `lookup` when none are given.
pub const PROBE_IDS: [u64; 2] = [1_234_567_890, 1_876_543_219];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteTotals {
    pub files: u64,
    pub bytes: u64,
    pub failed: u64,
}

/// Writes every regular file named by `paths`. Directories contribute their
/// direct entries in name order.
pub fn write_paths(
    store: &mut StreamStore,
    paths: &[PathBuf],
    mmap: bool,
    out: &mut dyn Write,
) -> Result<WriteTotals> {
    let mut totals = WriteTotals::default();

    for path in paths {
        if path.is_dir() {
            let mut entries = fs::read_dir(path)
                .wrap_err_with(|| format!("Cannot open directory={}", path.display()))?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()?;
            entries.sort();
            for entry in entries {
                write_file(store, &entry, mmap, out, &mut totals)?;
            }
        } else {
            write_file(store, path, mmap, out, &mut totals)?;
        }
    }

    writeln!(
        out,
        "Write: {} files, total size {} bytes",
        totals.files, totals.bytes
    )?;
    Ok(totals)
}

fn write_file(
    store: &mut StreamStore,
    path: &Path,
    mmap: bool,
    out: &mut dyn Write,
    totals: &mut WriteTotals,
) -> Result<()> {
    let meta = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta,
        _ => return Ok(()),
    };

    let size = meta.len();
    let mut header = StreamHeader::new(description_for(path), type_class(size), now_millis(), size);

    writeln!(out)?;
    writeln!(out, "WriteFile: descr='{}', size={} ...", header.description, size)?;

    let written = if mmap {
        write_mapped(store, path, &mut header)
    } else {
        File::open(path)
            .wrap_err_with(|| format!("Error opening file '{}'", path.display()))
            .and_then(|file| store.write(&mut header, BufReader::new(file)))
    };

    match written {
        Ok(id) => {
            totals.files += 1;
            totals.bytes += header.size;
            writeln!(
                out,
                "WriteFile: descr='{}', size={} [id={}]",
                header.description, header.size, id
            )?;
        }
        Err(_) => {
            totals.failed += 1;
            writeln!(out, "WriteFile: descr='{}', size={} [ERROR]", header.description, size)?;
        }
    }
    Ok(())
}

fn write_mapped(store: &mut StreamStore, path: &Path, header: &mut StreamHeader) -> Result<u64> {
    if header.size == 0 {
        return store.write_bytes(header, &[]);
    }

    let file = File::open(path).wrap_err_with(|| format!("open() failed for '{}'", path.display()))?;
    // SAFETY: the map is read-only and dropped before this function returns.
    let map = unsafe { Mmap::map(&file) }
        .wrap_err_with(|| format!("mmap() failed for '{}'", path.display()))?;
    header.size = header.size.min(map.len() as u64);
    store.write_bytes(header, &map)
}

/// Prints every stream of `range`.
pub fn read_range(
    store: &mut StreamStore,
    column: RangeColumn,
    range: KeyRange,
    out: &mut dyn Write,
) -> Result<ScanSummary> {
    let mut visitor = ReportVisitor::new(&mut *out);
    let summary = store.scan(column, range, &mut visitor)?;
    visitor.take_error()?;
    let mismatches = visitor.mismatches();

    writeln!(
        out,
        "Read: {} streams, {} bytes, {} batches{}",
        summary.streams,
        summary.bytes,
        summary.batches,
        if mismatches > 0 { " [ERROR]" } else { "" }
    )?;
    Ok(summary)
}

/// Re-reads from the last completely delivered id every `interval`, forever
/// unless `rounds` limits it.
pub fn follow(
    store: &mut StreamStore,
    start_id: u64,
    interval: Duration,
    rounds: Option<u64>,
    out: &mut dyn Write,
) -> Result<u64> {
    let mut last_id = start_id;
    let mut round = 0;

    while rounds.map_or(true, |limit| round < limit) {
        writeln!(out, "StreamReader: Reading all records from id={} ...", last_id + 1)?;

        let mut visitor = ReportVisitor::resume(&mut *out, last_id);
        store.read_by_id(KeyRange::starting_at(last_id + 1), &mut visitor)?;
        visitor.take_error()?;
        last_id = visitor.last_id();

        round += 1;
        if rounds.map_or(true, |limit| round < limit) {
            thread::sleep(interval);
        }
    }
    Ok(last_id)
}

/// Prints the first and last streams and probes `ids`.
pub fn lookup(store: &mut StreamStore, ids: &[u64], out: &mut dyn Write) -> Result<()> {
    let first = store.first()?;
    if first.id > 0 {
        writeln!(out, "First record: id={}, descr={}", first.id, first.description)?;
        writeln!(out, "Lookup id={}: {}", first.id, store.lookup_by_id(first.id)?)?;
    } else {
        writeln!(out, "No first record found")?;
    }

    let last = store.last()?;
    if last.id > 0 {
        writeln!(out, "Last record: id={}, descr={}", last.id, last.description)?;
        writeln!(out, "Lookup id={}: {}", last.id, store.lookup_by_id(last.id)?)?;
    } else {
        writeln!(out, "No last record found")?;
    }

    let probes: &[u64] = if ids.is_empty() { &PROBE_IDS } else { ids };
    for &id in probes {
        writeln!(out, "Lookup id={}: {}", id, store.lookup_by_id(id)?)?;
    }
    Ok(())
}

/// Deletes `range`; the all-rows range needs `all` to be set.
pub fn delete(
    store: &mut StreamStore,
    column: RangeColumn,
    range: KeyRange,
    all: bool,
    reset_ids: bool,
    out: &mut dyn Write,
) -> Result<usize> {
    let range = if all { KeyRange::all() } else { range };
    ensure!(
        all || !range.is_all(),
        "refusing to delete every stream without --all"
    );

    if all {
        writeln!(out, "Deleting all records from '{}'...", store.path().display())?;
    }
    let deleted = store.delete(column, range, reset_ids)?;
    writeln!(out, "Deleted {} streams", deleted)?;
    Ok(deleted)
}

pub fn describe(store: &mut StreamStore, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Describe '{}' tables...", store.path().display())?;
    store.describe()
}

/// The full demonstration sequence.
pub fn demo(
    store: &mut StreamStore,
    dir: &Path,
    large_file: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    describe(store, out)?;
    lookup(store, &[], out)?;

    if dir.is_dir() {
        write_paths(store, &[dir.to_path_buf()], false, out)?;
    } else {
        writeln!(out, "The directory \"{}\" doesn't exist or isn't readable", dir.display())?;
    }

    if let Some(large) = large_file {
        if large.is_file() {
            write_paths(store, &[large.to_path_buf()], true, out)?;
        } else {
            writeln!(out, "The file \"{}\" doesn't exist or isn't readable", large.display())?;
        }
    }

    writeln!(out, "Reading all records from '{}'...", store.path().display())?;
    read_range(store, RangeColumn::Id, KeyRange::all(), out)?;
    lookup(store, &[], out)?;

    delete(store, RangeColumn::Id, KeyRange::all(), true, false, out)?;
    lookup(store, &[], out)?;

    writeln!(out, "Done!")?;
    Ok(())
}
