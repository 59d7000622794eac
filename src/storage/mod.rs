//! # Storage Module
//!
//! Byte-level layout of stream payloads. Payloads are split into chunk rows
//! no larger than [`MAX_CELL_SIZE`](crate::config::MAX_CELL_SIZE) on write and
//! copied back out in read-buffer sized pieces on scan.
//!
//! ```text
//! stream (header row)
//!   └── streamdata rows, ascending id
//!         [chunk 0: cell bytes][chunk 1: cell bytes]...[chunk n: tail]
//! ```

pub mod chunk;

pub use chunk::{fill_chunk, for_each_piece, ChunkBuffer, PieceRun};
