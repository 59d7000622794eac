//! # Read Reports
//!
//! Printing visitor used by the `read`, `demo` and follow commands, plus the
//! helpers that turn a file into a stream header.
//!
//! ## Output Format
//!
//! ```text
//! OnRead: id=3, descr='notes.txt', type=1, size=2048 ...
//! OnRead: id=3, descr='notes.txt', type=1, size=2048, read_size=2048
//! OnRead[ERROR]: id=4, descr='cut.bin', type=0, size=10, read_size=7
//! ```
//!
//! A stream whose delivered byte count differs from its declared size is
//! reported with `[ERROR]` and does not advance [`ReportVisitor::last_id`].

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MAX_DESCRIPTION_LEN;
use crate::stream::{StreamHeader, StreamVisitor};

/// Size class stored in the `type` column for files written by the CLI.
pub fn type_class(size: u64) -> u8 {
    if size < 1024 {
        0
    } else if size < 64 * 1024 {
        1
    } else {
        2
    }
}

/// Stream description for a file: its base name with quotes and spaces
/// replaced by underscores, cut to the description limit.
pub fn description_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut descr: String = name
        .chars()
        .map(|c| if c == '\'' || c == ' ' { '_' } else { c })
        .collect();

    if descr.len() > MAX_DESCRIPTION_LEN {
        let mut cut = MAX_DESCRIPTION_LEN;
        while !descr.is_char_boundary(cut) {
            cut -= 1;
        }
        descr.truncate(cut);
    }
    descr
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Prints one line per stream begin and end, counting delivered bytes.
pub struct ReportVisitor<W: Write> {
    out: W,
    read_size: u64,
    last_id: u64,
    streams: u64,
    mismatches: u64,
    io_error: Option<io::Error>,
}

impl<W: Write> ReportVisitor<W> {
    pub fn new(out: W) -> Self {
        Self::resume(out, 0)
    }

    /// Visitor whose `last_id` starts at `last_id`, for follow mode.
    pub fn resume(out: W, last_id: u64) -> Self {
        Self {
            out,
            read_size: 0,
            last_id,
            streams: 0,
            mismatches: 0,
            io_error: None,
        }
    }

    /// Id of the last stream delivered completely.
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn streams(&self) -> u64 {
        self.streams
    }

    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    /// Returns the first output error, if printing failed.
    pub fn take_error(&mut self) -> io::Result<()> {
        match self.io_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) -> ControlFlow<()> {
        match self.out.write_fmt(line).and_then(|_| self.out.write_all(b"\n")) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                self.io_error = Some(err);
                ControlFlow::Break(())
            }
        }
    }
}

impl<W: Write> StreamVisitor for ReportVisitor<W> {
    fn on_begin(&mut self, header: &StreamHeader) -> ControlFlow<()> {
        self.read_size = 0;
        self.emit(format_args!(
            "OnRead: id={}, descr='{}', type={}, size={} ...",
            header.id, header.description, header.stream_type, header.size
        ))
    }

    fn on_data(&mut self, _header: &StreamHeader, data: &[u8]) -> ControlFlow<()> {
        self.read_size += data.len() as u64;
        ControlFlow::Continue(())
    }

    fn on_end(&mut self, header: &StreamHeader) -> ControlFlow<()> {
        let complete = self.read_size == header.size;
        if complete {
            self.last_id = header.id;
            self.streams += 1;
        } else {
            self.mismatches += 1;
        }

        let read_size = self.read_size;
        self.read_size = 0;
        self.emit(format_args!(
            "OnRead{}: id={}, descr='{}', type={}, size={}, read_size={}",
            if complete { "" } else { "[ERROR]" },
            header.id,
            header.description,
            header.stream_type,
            header.size,
            read_size
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_class_boundaries() {
        assert_eq!(type_class(0), 0);
        assert_eq!(type_class(1023), 0);
        assert_eq!(type_class(1024), 1);
        assert_eq!(type_class(64 * 1024 - 1), 1);
        assert_eq!(type_class(64 * 1024), 2);
    }

    #[test]
    fn test_description_escapes_name() {
        assert_eq!(description_for(Path::new("/tmp/my file's.txt")), "my_file_s.txt");
        assert_eq!(description_for(Path::new("/")), "");

        let long = format!("/tmp/{}", "é".repeat(100));
        let descr = description_for(Path::new(&long));
        assert!(descr.len() <= MAX_DESCRIPTION_LEN);
        assert_eq!(descr.chars().count(), MAX_DESCRIPTION_LEN / 2);
    }

    #[test]
    fn test_report_lines() {
        let header = StreamHeader {
            id: 3,
            description: "a.bin".into(),
            stream_type: 0,
            timestamp: 0,
            size: 4,
        };
        let mut visitor = ReportVisitor::new(Vec::new());

        assert!(visitor.on_begin(&header).is_continue());
        assert!(visitor.on_data(&header, b"ab").is_continue());
        assert!(visitor.on_data(&header, b"cd").is_continue());
        assert!(visitor.on_end(&header).is_continue());

        let short = StreamHeader { id: 4, ..header.clone() };
        let _ = visitor.on_begin(&short);
        let _ = visitor.on_data(&short, b"x");
        let _ = visitor.on_end(&short);

        assert_eq!(visitor.last_id(), 3);
        assert_eq!(visitor.streams(), 1);
        assert_eq!(visitor.mismatches(), 1);

        let text = String::from_utf8(visitor.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "OnRead: id=3, descr='a.bin', type=0, size=4 ...");
        assert_eq!(lines[1], "OnRead: id=3, descr='a.bin', type=0, size=4, read_size=4");
        assert_eq!(lines[3], "OnRead[ERROR]: id=4, descr='a.bin', type=0, size=4, read_size=1");
    }
}
