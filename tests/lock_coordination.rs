//! # Lock Coordinator Tests
//!
//! Several stores on the same database file, one per thread:
//! 1. A delete waits while a scan batch holds the READ lock
//! 2. A write proceeds while a scan batch holds the READ lock
//! 3. Lock counters are shared by every store on the file
//!
//! The scanning thread parks inside `on_begin` until the main thread lets
//! it continue, so the READ lock is held for a known window.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use dbstream::{KeyRange, NullSink, ReadEvent, StreamHeader, StreamStore};
use tempfile::tempdir;

fn open(path: &Path) -> StreamStore {
    StreamStore::builder()
        .path(path)
        .create_if_missing(true)
        .sink(NullSink)
        .open()
        .unwrap()
}

fn write(store: &mut StreamStore, descr: &str) -> u64 {
    let mut header = StreamHeader::new(descr, 0, 1, 4);
    store.write_bytes(&mut header, b"data").unwrap()
}

#[test]
fn delete_waits_for_scan_but_write_does_not() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("locks.db");

    let mut writer = open(&path);
    write(&mut writer, "seed");

    let (started_tx, started_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();
    let reader_path = path.clone();
    let reader = thread::spawn(move || {
        let mut store = open(&reader_path);
        store
            .read_by_id(KeyRange::all(), &mut |event: ReadEvent<'_>| {
                if let ReadEvent::Begin(_) = event {
                    started_tx.send(()).unwrap();
                    resume_rx.recv().unwrap();
                }
                ControlFlow::Continue(())
            })
            .unwrap()
    });
    started_rx.recv_timeout(Duration::from_secs(10)).unwrap();

    let writes_before = writer.lock_stats().writes();
    let reads_before = writer.lock_stats().reads();
    let id = write(&mut writer, "during scan");
    assert_eq!(id, 2);
    assert_eq!(writer.lock_stats().writes(), writes_before);
    assert_eq!(writer.lock_stats().reads(), reads_before);

    let (deleted_tx, deleted_rx) = mpsc::channel();
    let deleter_path = path.clone();
    let deleter = thread::spawn(move || {
        let mut store = open(&deleter_path);
        let deleted = store.delete_all(false).unwrap();
        deleted_tx.send(deleted).unwrap();
    });

    assert!(
        deleted_rx.recv_timeout(Duration::from_millis(300)).is_err(),
        "delete finished while the READ lock was held"
    );

    resume_tx.send(()).unwrap();
    let deleted = deleted_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(deleted, 2);

    let summary = reader.join().unwrap();
    assert_eq!(summary.streams, 1);
    deleter.join().unwrap();

    assert_eq!(writer.first().unwrap().id, 0);
}

#[test]
fn stores_on_one_file_share_lock_counters() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let mut a = open(&path);
    let mut b = open(&path);
    write(&mut a, "x");

    let reads = a.lock_stats().reads();
    assert!(b.lookup_by_id(1).unwrap());
    assert_eq!(a.lock_stats().reads(), reads + 1);

    let writes = b.lock_stats().writes();
    a.delete_all(false).unwrap();
    assert_eq!(b.lock_stats().writes(), writes + 1);
}

#[test]
fn stores_on_different_files_do_not_block_each_other() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("one.db");
    let second = dir.path().join("two.db");

    let mut other = open(&second);
    write(&mut other, "other");

    let (started_tx, started_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();
    let reader = thread::spawn(move || {
        let mut store = open(&first);
        let mut header = StreamHeader::new("mine", 0, 1, 1);
        store.write_bytes(&mut header, b"m").unwrap();
        store
            .read_by_id(KeyRange::all(), &mut |event: ReadEvent<'_>| {
                if let ReadEvent::Begin(_) = event {
                    started_tx.send(()).unwrap();
                    resume_rx.recv().unwrap();
                }
                ControlFlow::Continue(())
            })
            .unwrap();
    });
    started_rx.recv_timeout(Duration::from_secs(10)).unwrap();

    assert_eq!(other.delete_all(false).unwrap(), 1);

    resume_tx.send(()).unwrap();
    reader.join().unwrap();
}
