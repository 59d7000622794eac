//! Cursor scanner.
//!
//! Streams of a range are delivered batch by batch. Each batch holds the
//! READ lock from the header query until the last stream of the batch has
//! been handed to the visitor, so deletes wait for at most one batch.

use std::ops::ControlFlow;

use eyre::{Result, WrapErr};
use rusqlite::{params_from_iter, Connection, DatabaseName};

use super::query::{header_from_row, to_sql_int, Cursor, HEADER_COLUMNS};
use super::StreamStore;
use crate::config::{CHUNK_TABLE, LOG_PREFIX};
use crate::diagnostics::Diagnostics;
use crate::storage::for_each_piece;
use crate::stream::{KeyRange, RangeColumn, ScanSummary, StreamHeader, StreamVisitor};

impl StreamStore {
    /// Delivers every stream in `range` of `column`, in ascending column
    /// order, to `visitor`.
    pub fn scan(
        &mut self,
        column: RangeColumn,
        range: KeyRange,
        visitor: &mut dyn StreamVisitor,
    ) -> Result<ScanSummary> {
        self.guarded("scan", |store| store.scan_batches(column, range, visitor))
    }

    /// Like [`scan`](Self::scan), with the column given by name.
    /// Only `id` and `timestamp` are accepted.
    pub fn read(
        &mut self,
        column: &str,
        range: KeyRange,
        visitor: &mut dyn StreamVisitor,
    ) -> Result<ScanSummary> {
        self.guarded("scan", |store| {
            let column: RangeColumn = column.parse()?;
            store.scan_batches(column, range, visitor)
        })
    }

    pub fn read_by_id(&mut self, range: KeyRange, visitor: &mut dyn StreamVisitor) -> Result<ScanSummary> {
        self.scan(RangeColumn::Id, range, visitor)
    }

    pub fn read_by_timestamp(
        &mut self,
        range: KeyRange,
        visitor: &mut dyn StreamVisitor,
    ) -> Result<ScanSummary> {
        self.scan(RangeColumn::Timestamp, range, visitor)
    }

    fn scan_batches(
        &mut self,
        column: RangeColumn,
        range: KeyRange,
        visitor: &mut dyn StreamVisitor,
    ) -> Result<ScanSummary> {
        let Self {
            conn,
            table_lock,
            buffer,
            log,
            config,
            ..
        } = self;

        let limit = config.batch_size;
        let piece = buffer.window(config.read_buffer_size);
        let mut cursor = Cursor::new(column);
        let mut summary = ScanSummary::default();

        loop {
            let predicate = cursor.predicate(&range);
            let sql = format!(
                "SELECT {} FROM stream{} ORDER BY {} LIMIT {}",
                HEADER_COLUMNS,
                predicate.where_clause(),
                column.order_by(),
                limit
            );

            let guard = table_lock.read(conn)?;
            let headers = {
                let mut stmt = guard.prepare_cached(&sql)?;
                let rows = stmt.query_map(params_from_iter(predicate.params()), header_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .wrap_err("failed to fetch stream headers")?
            };
            summary.batches += 1;

            let mut stopped = false;
            for header in &headers {
                cursor.advance(header);
                summary.streams += 1;
                let flow = visit_stream(&guard, header, piece, visitor, log, &mut summary)?;
                if flow.is_break() {
                    stopped = true;
                    break;
                }
            }
            guard.release()?;

            if stopped {
                log.info(format!("{}: ReadData stopped by caller", LOG_PREFIX));
                summary.cancelled = true;
                break;
            }
            if headers.len() < limit {
                break;
            }
        }

        Ok(summary)
    }
}

/// Delivers one stream. Returns `Break` when any callback asked to stop;
/// `on_end` is called exactly once either way.
fn visit_stream(
    conn: &Connection,
    header: &StreamHeader,
    piece: &mut [u8],
    visitor: &mut dyn StreamVisitor,
    log: &Diagnostics,
    summary: &mut ScanSummary,
) -> Result<ControlFlow<()>> {
    if header.is_empty() {
        log.info(format!(
            "{}: Invalid stream (size=0): id={}, descr='{}'",
            LOG_PREFIX, header.id, header.description
        ));
        let begin = visitor.on_begin(header);
        let end = visitor.on_end(header);
        return Ok(if begin.is_break() || end.is_break() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        });
    }

    let mut flow = visitor.on_begin(header);
    if flow.is_continue() {
        for chunk_id in chunk_ids(conn, header.id)? {
            let mut blob = conn
                .blob_open(DatabaseName::Main, CHUNK_TABLE, "data", chunk_id, true)
                .wrap_err_with(|| format!("failed to open chunk {} of stream {}", chunk_id, header.id))?;
            let run = for_each_piece(&mut blob, piece, |bytes| visitor.on_data(header, bytes))
                .wrap_err_with(|| format!("failed to read chunk {} of stream {}", chunk_id, header.id))?;
            summary.bytes += run.bytes;
            flow = run.flow;
            if flow.is_break() {
                break;
            }
        }
    }

    let end = visitor.on_end(header);
    Ok(if flow.is_break() || end.is_break() {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    })
}

fn chunk_ids(conn: &Connection, stream_id: u64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM streamdata WHERE masterid = ?1 ORDER BY id ASC")?;
    let ids = stmt
        .query_map([to_sql_int(stream_id)], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()
        .wrap_err_with(|| format!("failed to list chunks of stream {}", stream_id))?;
    Ok(ids)
}
