//! # Cursor Scanner Tests
//!
//! Checks the batch cursor against small batch sizes:
//! 1. Every stream of a range is delivered exactly once, in column order
//! 2. Duplicate timestamps across a batch boundary are neither lost nor repeated
//! 3. Inclusive/exclusive bounds, including `first == last` and timestamp 0
//! 4. A `Break` from any callback cancels the scan after one `on_end`

use std::ops::ControlFlow;

use dbstream::{KeyRange, NullSink, RangeColumn, ReadEvent, StreamHeader, StreamStore, StreamVisitor};
use tempfile::{tempdir, TempDir};

fn open(dir: &TempDir, batch_size: usize) -> StreamStore {
    StreamStore::builder()
        .path(dir.path().join("scan.db"))
        .create_if_missing(true)
        .batch_size(batch_size)
        .chunk_size(8)
        .sink(NullSink)
        .open()
        .unwrap()
}

fn write(store: &mut StreamStore, timestamp: u64, data: &[u8]) -> u64 {
    let mut header = StreamHeader::new(format!("ts-{}", timestamp), 0, timestamp, data.len() as u64);
    store.write_bytes(&mut header, data).unwrap()
}

/// Ids in the order `on_begin` saw them.
fn ids(store: &mut StreamStore, column: RangeColumn, range: KeyRange) -> Vec<u64> {
    let mut ids = Vec::new();
    store
        .scan(column, range, &mut |event: ReadEvent<'_>| {
            if let ReadEvent::Begin(header) = event {
                ids.push(header.id);
            }
            ControlFlow::Continue(())
        })
        .unwrap();
    ids
}

mod batches {
    use super::*;

    #[test]
    fn every_stream_once_with_tiny_batches() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 3);
        for i in 1..=10 {
            write(&mut store, i * 100, b"abc");
        }

        let mut begins = 0;
        let summary = store
            .read_by_id(KeyRange::all(), &mut |event: ReadEvent<'_>| {
                if let ReadEvent::Begin(_) = event {
                    begins += 1;
                }
                ControlFlow::Continue(())
            })
            .unwrap();

        assert_eq!(begins, 10);
        assert_eq!(summary.streams, 10);
        // 3 + 3 + 3 + 1
        assert_eq!(summary.batches, 4);
        assert!(!summary.cancelled);
    }

    #[test]
    fn exact_multiple_needs_one_empty_batch() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 2);
        for i in 1..=4 {
            write(&mut store, i, b"x");
        }

        let summary = store
            .read_by_id(KeyRange::all(), &mut |_: ReadEvent<'_>| ControlFlow::Continue(()))
            .unwrap();
        assert_eq!(summary.streams, 4);
        assert_eq!(summary.batches, 3);
    }

    #[test]
    fn duplicate_timestamps_cross_batch_boundary() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 2);
        // ids 1..=5, timestamps 50, 10, 10, 10, 20
        for ts in [50, 10, 10, 10, 20] {
            write(&mut store, ts, b"payload");
        }

        assert_eq!(
            ids(&mut store, RangeColumn::Timestamp, KeyRange::all()),
            vec![2, 3, 4, 5, 1]
        );
        assert_eq!(
            ids(&mut store, RangeColumn::Timestamp, KeyRange::between(10, 20)),
            vec![2, 3, 4, 5]
        );
        assert_eq!(
            ids(&mut store, RangeColumn::Timestamp, KeyRange::new(10, false, 0, true)),
            vec![5, 1]
        );
    }
}

mod bounds {
    use super::*;

    fn filled() -> (TempDir, StreamStore) {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 100);
        for i in 1..=6 {
            write(&mut store, i * 10, b"z");
        }
        (dir, store)
    }

    #[test]
    fn inclusive_and_exclusive_id_bounds() {
        let (_dir, mut store) = filled();

        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::new(2, true, 4, true)), vec![2, 3, 4]);
        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::new(2, false, 4, false)), vec![3]);
        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::new(0, true, 3, false)), vec![1, 2]);
        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::starting_at(5)), vec![5, 6]);
    }

    #[test]
    fn first_equal_to_last() {
        let (_dir, mut store) = filled();

        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::single(3)), vec![3]);
        assert!(ids(&mut store, RangeColumn::Id, KeyRange::new(3, false, 3, true)).is_empty());
        assert!(ids(&mut store, RangeColumn::Id, KeyRange::new(3, true, 3, false)).is_empty());
        assert!(ids(&mut store, RangeColumn::Id, KeyRange::new(3, false, 3, false)).is_empty());
        assert!(ids(&mut store, RangeColumn::Timestamp, KeyRange::new(30, false, 30, false)).is_empty());
    }

    #[test]
    fn zero_timestamp_is_never_stored() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 100);

        let mut header = StreamHeader::new("zero", 0, 0, 1);
        assert!(store.write_bytes(&mut header, b"z").is_err());
        assert_eq!(header.id, 0);

        let early = write(&mut store, 1, b"a");
        let middle = write(&mut store, 5, b"b");
        let late = write(&mut store, 9, b"c");

        assert_eq!(ids(&mut store, RangeColumn::Timestamp, KeyRange::single(1)), vec![early]);
        assert_eq!(ids(&mut store, RangeColumn::Timestamp, KeyRange::single(5)), vec![middle]);

        assert_eq!(store.delete(RangeColumn::Timestamp, KeyRange::single(5), false).unwrap(), 1);
        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::all()), vec![early, late]);
    }

    #[test]
    fn timestamp_column_by_name() {
        let (_dir, mut store) = filled();

        let mut seen = Vec::new();
        store
            .read("timestamp", KeyRange::between(20, 40), &mut |event: ReadEvent<'_>| {
                if let ReadEvent::End(header) = event {
                    seen.push(header.timestamp);
                }
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(seen, vec![20, 30, 40]);

        let err = store
            .read("size", KeyRange::all(), &mut |_: ReadEvent<'_>| ControlFlow::Continue(()))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid column='size'"));
    }
}

mod cancellation {
    use super::*;

    /// Records callbacks and breaks on the n-th `on_data`.
    struct StopAfter {
        data_calls: usize,
        stop_at: usize,
        log: Vec<String>,
    }

    impl StreamVisitor for StopAfter {
        fn on_begin(&mut self, header: &StreamHeader) -> ControlFlow<()> {
            self.log.push(format!("begin {}", header.id));
            ControlFlow::Continue(())
        }

        fn on_data(&mut self, header: &StreamHeader, _data: &[u8]) -> ControlFlow<()> {
            self.data_calls += 1;
            self.log.push(format!("data {}", header.id));
            if self.data_calls == self.stop_at {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }

        fn on_end(&mut self, header: &StreamHeader) -> ControlFlow<()> {
            self.log.push(format!("end {}", header.id));
            ControlFlow::Continue(())
        }
    }

    #[test]
    fn break_in_on_data_ends_current_stream_and_scan() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 2);
        // 20 bytes with 8-byte chunks: three on_data calls per stream
        for i in 1..=4 {
            write(&mut store, i, &[i as u8; 20]);
        }

        let mut visitor = StopAfter {
            data_calls: 0,
            stop_at: 4,
            log: Vec::new(),
        };
        let summary = store.read_by_id(KeyRange::all(), &mut visitor).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.streams, 2);
        assert_eq!(
            visitor.log,
            vec!["begin 1", "data 1", "data 1", "data 1", "end 1", "begin 2", "data 2", "end 2"]
        );
    }

    #[test]
    fn break_in_on_begin_still_calls_on_end() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 10);
        write(&mut store, 1, b"data");
        write(&mut store, 2, b"more");

        let mut events = Vec::new();
        let summary = store
            .read_by_id(KeyRange::all(), &mut |event: ReadEvent<'_>| match event {
                ReadEvent::Begin(h) => {
                    events.push(format!("begin {}", h.id));
                    ControlFlow::Break(())
                }
                ReadEvent::Data(h, _) => {
                    events.push(format!("data {}", h.id));
                    ControlFlow::Continue(())
                }
                ReadEvent::End(h) => {
                    events.push(format!("end {}", h.id));
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(events, vec!["begin 1", "end 1"]);
    }

    #[test]
    fn store_is_usable_after_cancelled_scan() {
        let dir = tempdir().unwrap();
        let mut store = open(&dir, 1);
        write(&mut store, 1, b"one");
        write(&mut store, 2, b"two");

        store
            .read_by_id(KeyRange::all(), &mut |_: ReadEvent<'_>| ControlFlow::Break(()))
            .unwrap();

        write(&mut store, 3, b"three");
        assert_eq!(ids(&mut store, RangeColumn::Id, KeyRange::all()), vec![1, 2, 3]);
        assert_eq!(store.delete_by_id(KeyRange::single(1)).unwrap(), 1);
    }
}
