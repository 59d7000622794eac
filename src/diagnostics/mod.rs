//! # Diagnostic Sink
//!
//! Every informational and error message the engine produces goes through a
//! [`DiagnosticSink`]. The store owns exactly one sink, supplied through
//! [`StoreBuilder::sink`](crate::StoreBuilder::sink); when none is supplied the
//! [`TracingSink`] forwards messages to the `tracing` ecosystem.
//!
//! ## Message Flow
//!
//! ```text
//! ┌──────────────┐   info/error    ┌─────────────┐   is_live()?   ┌──────────────┐
//! │ StreamStore  │ ──────────────► │ Diagnostics │ ─────────────► │ dyn Sink     │
//! │ (operations) │                 │  (wrapper)  │                │ (caller)     │
//! └──────────────┘                 └─────────────┘                └──────────────┘
//! ```
//!
//! ## Liveness
//!
//! A sink may report itself not live (for example after its output has been
//! closed). Messages are dropped while `is_live()` returns false. The default
//! implementation always reports live.
//!
//! ## Error Reporting
//!
//! Operation failures are reported once, at the public operation boundary,
//! as a single `ERROR: <operation>: <cause chain>` line. The same error is
//! also returned to the caller.

use tracing::{error, info};

/// Receiver for the engine's diagnostic output.
pub trait DiagnosticSink: Send {
    /// Returns false when messages should be dropped.
    fn is_live(&self) -> bool {
        true
    }

    fn on_info(&self, message: &str);

    fn on_error(&self, message: &str);
}

/// Default sink: forwards messages to `tracing` under the `dbstream` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn on_info(&self, message: &str) {
        info!(target: "dbstream", "{}", message);
    }

    fn on_error(&self, message: &str) {
        error!(target: "dbstream", "{}", message);
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn is_live(&self) -> bool {
        false
    }

    fn on_info(&self, _message: &str) {}

    fn on_error(&self, _message: &str) {}
}

pub(crate) struct Diagnostics {
    sink: Box<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub(crate) fn new(sink: Box<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn info(&self, message: impl AsRef<str>) {
        if self.sink.is_live() {
            self.sink.on_info(message.as_ref());
        }
    }

    pub(crate) fn error(&self, message: impl AsRef<str>) {
        if self.sink.is_live() {
            self.sink.on_error(message.as_ref());
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("live", &self.sink.is_live())
            .finish()
    }
}
