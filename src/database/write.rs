//! Write pipeline.
//!
//! A write is one transaction: the header row is inserted with `size = 0`,
//! the payload is copied into chunk rows, the size is patched and the
//! transaction commits. Nothing of a failed write survives.
//!
//! Writes take no table lock. Concurrent writers on different stores are
//! serialized by the backend alone.

use std::io::Read;

use eyre::{ensure, Result, WrapErr};
use rusqlite::params;

use super::query::to_sql_int;
use super::StreamStore;
use crate::storage::fill_chunk;
use crate::stream::StreamHeader;

impl StreamStore {
    /// Stores everything `source` yields as a new stream.
    ///
    /// On success `header.id` and `header.size` are set to the assigned id
    /// and the number of bytes stored; the id is also returned. On failure
    /// the header is left untouched.
    pub fn write<R: Read>(&mut self, header: &mut StreamHeader, mut source: R) -> Result<u64> {
        self.guarded("write", |store| store.write_stream(header, &mut source))
    }

    /// Stores the first `header.size` bytes of `data` as a new stream.
    pub fn write_bytes(&mut self, header: &mut StreamHeader, data: &[u8]) -> Result<u64> {
        self.guarded("write", |store| {
            ensure!(
                header.size <= data.len() as u64,
                "declared size {} exceeds the {} bytes supplied",
                header.size,
                data.len()
            );
            let mut payload = &data[..header.size as usize];
            store.write_stream(header, &mut payload)
        })
    }

    fn write_stream(&mut self, header: &mut StreamHeader, source: &mut dyn Read) -> Result<u64> {
        header.validate_for_write()?;

        let Self {
            conn,
            buffer,
            config,
            ..
        } = self;

        let tx = conn.transaction().wrap_err("failed to begin write")?;
        tx.execute(
            "INSERT INTO stream (descr, type, size, timestamp) VALUES (?1, ?2, 0, ?3)",
            params![header.description, header.stream_type, to_sql_int(header.timestamp)],
        )
        .wrap_err("failed to insert stream header")?;
        let master_id = tx.last_insert_rowid();

        let mut total: u64 = 0;
        {
            let mut insert =
                tx.prepare_cached("INSERT INTO streamdata (masterid, data) VALUES (?1, ?2)")?;
            let chunk = buffer.window(config.chunk_size);
            loop {
                let n = fill_chunk(&mut *source, chunk).wrap_err("failed to read stream source")?;
                if n == 0 {
                    break;
                }
                insert
                    .execute(params![master_id, &chunk[..n]])
                    .wrap_err_with(|| format!("failed to insert chunk of stream {}", master_id))?;
                total += n as u64;
                if n < chunk.len() {
                    break;
                }
            }
        }

        tx.execute(
            "UPDATE stream SET size = ?1 WHERE id = ?2",
            params![to_sql_int(total), master_id],
        )
        .wrap_err("failed to update stream size")?;
        tx.commit().wrap_err("failed to commit write")?;

        header.id = master_id as u64;
        header.size = total;
        Ok(header.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use std::io::{self, ErrorKind};
    use tempfile::{tempdir, TempDir};

    fn store(chunk_size: usize) -> (TempDir, StreamStore) {
        let dir = tempdir().unwrap();
        let store = StreamStore::builder()
            .path(dir.path().join("w.db"))
            .create_if_missing(true)
            .chunk_size(chunk_size)
            .sink(NullSink)
            .open()
            .unwrap();
        (dir, store)
    }

    fn chunk_lengths(store: &StreamStore, id: u64) -> Vec<i64> {
        let mut stmt = store
            .conn
            .prepare("SELECT length(data) FROM streamdata WHERE masterid = ?1 ORDER BY id")
            .unwrap();
        let rows = stmt.query_map([id as i64], |row| row.get(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_write_splits_into_full_chunks() {
        let (_dir, mut store) = store(10);
        let data = vec![3u8; 25];
        let mut header = StreamHeader::new("split", 1, 5, 0);

        let id = store.write(&mut header, &data[..]).unwrap();

        assert_eq!(header.id, id);
        assert_eq!(header.size, 25);
        assert_eq!(chunk_lengths(&store, id), vec![10, 10, 5]);
    }

    #[test]
    fn test_empty_write_has_no_chunks() {
        let (_dir, mut store) = store(10);
        let mut header = StreamHeader::new("empty", 0, 1, 0);

        let id = store.write(&mut header, io::empty()).unwrap();

        assert_eq!(header.size, 0);
        assert!(chunk_lengths(&store, id).is_empty());
    }

    #[test]
    fn test_write_bytes_uses_declared_size() {
        let (_dir, mut store) = store(4);
        let mut header = StreamHeader::new("prefix", 0, 1, 6);

        let id = store.write_bytes(&mut header, b"abcdefghij").unwrap();
        assert_eq!(chunk_lengths(&store, id), vec![4, 2]);

        let mut too_big = StreamHeader::new("too big", 0, 1, 11);
        assert!(store.write_bytes(&mut too_big, b"abcdefghij").is_err());
        assert_eq!(too_big.id, 0);
    }

    #[test]
    fn test_failed_source_rolls_back() {
        struct FailAfter(usize);

        impl Read for FailAfter {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 == 0 {
                    return Err(io::Error::new(ErrorKind::BrokenPipe, "source closed"));
                }
                let n = self.0.min(buf.len());
                self.0 -= n;
                buf[..n].fill(1);
                Ok(n)
            }
        }

        let (_dir, mut store) = store(8);
        let mut header = StreamHeader::new("broken", 0, 1, 0);

        assert!(store.write(&mut header, FailAfter(20)).is_err());
        assert_eq!(header.id, 0);

        let headers: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM stream", [], |r| r.get(0))
            .unwrap();
        let chunks: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM streamdata", [], |r| r.get(0))
            .unwrap();
        assert_eq!((headers, chunks), (0, 0));
    }

    #[test]
    fn test_long_description_is_rejected() {
        let (_dir, mut store) = store(8);
        let mut header = StreamHeader::new("d".repeat(121), 0, 1, 0);
        assert!(store.write(&mut header, io::empty()).is_err());
    }
}
