//! # Chunk Codec
//!
//! A stream is stored as an ordered run of chunk rows, each carrying at most
//! one cell worth of payload. This module owns the byte-level half of that
//! layout; the SQL half lives in the write and scan operations.
//!
//! ## Write Direction
//!
//! ```text
//! source (impl Read) ──fill_chunk──► [ chunk_size bytes ] ──► INSERT streamdata
//!                    ──fill_chunk──► [ chunk_size bytes ] ──► INSERT streamdata
//!                    ──fill_chunk──► [ tail < chunk_size ] ──► INSERT streamdata
//!                    ──fill_chunk──► 0                     ──► done
//! ```
//!
//! `fill_chunk` keeps reading until the chunk is full or the source reports
//! end of input, so short reads from pipes or sockets never produce short
//! chunks in the middle of a stream.
//!
//! ## Read Direction
//!
//! Each stored chunk is opened as an incremental BLOB and copied out in
//! pieces of at most `read_buffer_size` bytes. `for_each_piece` hands each
//! non-empty piece to the caller until the chunk is exhausted or the caller
//! breaks.
//!
//! ## Buffer Ownership
//!
//! One [`ChunkBuffer`] is allocated per store and reused by every write and
//! read. Pieces handed to visitors borrow from it, so they cannot outlive the
//! callback.

use std::io::{self, ErrorKind, Read};
use std::ops::ControlFlow;

use crate::config::MAX_CELL_SIZE;

/// Reusable byte buffer shared by the write and read paths of one store.
pub struct ChunkBuffer {
    data: Box<[u8]>,
}

impl ChunkBuffer {
    /// Allocates a zeroed buffer of `capacity` bytes, clamped to `1..=MAX_CELL_SIZE`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CELL_SIZE);
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The first `len` bytes, or the whole buffer when `len` exceeds it.
    pub fn window(&mut self, len: usize) -> &mut [u8] {
        let len = len.min(self.data.len());
        &mut self.data[..len]
    }
}

impl std::fmt::Debug for ChunkBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkBuffer")
            .field("capacity", &self.data.len())
            .finish()
    }
}

/// Reads from `source` until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes placed in `buf`. A return value smaller than
/// `buf.len()` means end of input was reached. `Interrupted` errors are
/// retried; any other error is returned as is.
pub fn fill_chunk<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Outcome of copying one stored chunk out through the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceRun {
    pub bytes: u64,
    pub flow: ControlFlow<()>,
}

/// Copies `source` through `buf` and hands every non-empty piece to `sink`.
///
/// Stops early when `sink` breaks. Pieces are at most `buf.len()` bytes long;
/// only the final piece of the source may be shorter.
pub fn for_each_piece<R, F>(source: &mut R, buf: &mut [u8], mut sink: F) -> io::Result<PieceRun>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]) -> ControlFlow<()>,
{
    let mut run = PieceRun {
        bytes: 0,
        flow: ControlFlow::Continue(()),
    };

    loop {
        let n = fill_chunk(source, buf)?;
        if n == 0 {
            break;
        }

        run.bytes += n as u64;
        run.flow = sink(&buf[..n]);

        if run.flow.is_break() || n < buf.len() {
            break;
        }
    }

    Ok(run)
}
