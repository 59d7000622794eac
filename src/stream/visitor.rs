//! Stream visitor: the caller side of a scan.
//!
//! For every stream in a scanned range the store calls, in order:
//!
//! ```text
//! on_begin(header)                 exactly once
//! on_data(header, bytes)           zero or more times, never with empty bytes
//! on_end(header)                   exactly once, also after a cancellation
//! ```
//!
//! Returning [`ControlFlow::Break`] from any callback cancels the rest of
//! the scan. A break from `on_begin` or `on_data` still yields the `on_end`
//! call for the stream in progress.
//!
//! The `bytes` slice borrows the store's reusable buffer and is only valid
//! for the duration of the call.

use std::ops::ControlFlow;

use super::StreamHeader;

pub trait StreamVisitor {
    fn on_begin(&mut self, _header: &StreamHeader) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_data(&mut self, header: &StreamHeader, data: &[u8]) -> ControlFlow<()>;

    fn on_end(&mut self, _header: &StreamHeader) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// One visitor callback, for closure-based visitors.
#[derive(Debug, Clone, Copy)]
pub enum ReadEvent<'a> {
    Begin(&'a StreamHeader),
    Data(&'a StreamHeader, &'a [u8]),
    End(&'a StreamHeader),
}

impl ReadEvent<'_> {
    pub fn header(&self) -> &StreamHeader {
        match self {
            ReadEvent::Begin(header) | ReadEvent::Data(header, _) | ReadEvent::End(header) => header,
        }
    }
}

impl<F> StreamVisitor for F
where
    F: FnMut(ReadEvent<'_>) -> ControlFlow<()>,
{
    fn on_begin(&mut self, header: &StreamHeader) -> ControlFlow<()> {
        self(ReadEvent::Begin(header))
    }

    fn on_data(&mut self, header: &StreamHeader, data: &[u8]) -> ControlFlow<()> {
        self(ReadEvent::Data(header, data))
    }

    fn on_end(&mut self, header: &StreamHeader) -> ControlFlow<()> {
        self(ReadEvent::End(header))
    }
}

/// What a finished scan did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Streams for which `on_begin` was called.
    pub streams: u64,
    /// Payload bytes handed to `on_data`.
    pub bytes: u64,
    /// Header queries issued.
    pub batches: u64,
    /// True when a visitor callback returned `Break`.
    pub cancelled: bool,
}
