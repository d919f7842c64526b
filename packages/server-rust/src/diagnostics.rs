//! Diagnostics sink used by the performance and exception stages.
//!
//! Stages report through [`DiagnosticsSink`] rather than calling `tracing`
//! directly so that tests (and alternative deployments) can observe what the
//! pipeline reported. [`TracingSink`] is the production implementation.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

/// Something a stage wants an operator to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A handler took longer than the configured threshold.
    SlowRequest {
        request: &'static str,
        call_id: u64,
        caller: String,
        elapsed: Duration,
        threshold: Duration,
    },
    /// An unexpected failure was caught and withheld from the caller.
    UnhandledFailure {
        request: &'static str,
        call_id: u64,
        caller: String,
        detail: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlowRequest {
                request,
                call_id,
                caller,
                elapsed,
                threshold,
            } => write!(
                f,
                "long running request {request} (call {call_id}, caller {caller}): {}ms > {}ms",
                elapsed.as_millis(),
                threshold.as_millis()
            ),
            Self::UnhandledFailure {
                request,
                call_id,
                caller,
                detail,
            } => write!(
                f,
                "unhandled failure in {request} (call {call_id}, caller {caller}): {detail}"
            ),
        }
    }
}

/// Destination for pipeline diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    fn warn(&self, diagnostic: &Diagnostic);

    fn error(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn warn(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::SlowRequest {
                request,
                call_id,
                caller,
                elapsed,
                threshold,
            } => {
                #[allow(clippy::cast_possible_truncation)]
                let elapsed_ms = elapsed.as_millis() as u64;
                #[allow(clippy::cast_possible_truncation)]
                let threshold_ms = threshold.as_millis() as u64;
                tracing::warn!(
                    request = request,
                    call_id = call_id,
                    caller = %caller,
                    elapsed_ms = elapsed_ms,
                    threshold_ms = threshold_ms,
                    "long running request"
                );
            }
            other => tracing::warn!("{other}"),
        }
    }

    fn error(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::UnhandledFailure {
                request,
                call_id,
                caller,
                detail,
            } => tracing::error!(
                request = request,
                call_id = call_id,
                caller = %caller,
                detail = %detail,
                "unhandled failure"
            ),
            other => tracing::error!("{other}"),
        }
    }
}

/// Level a diagnostic was reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Error,
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, Diagnostic)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, in report order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Level, Diagnostic)> {
        self.entries.lock().clone()
    }
}

impl DiagnosticsSink for MemorySink {
    fn warn(&self, diagnostic: &Diagnostic) {
        self.entries.lock().push((Level::Warn, diagnostic.clone()));
    }

    fn error(&self, diagnostic: &Diagnostic) {
        self.entries.lock().push((Level::Error, diagnostic.clone()));
    }
}
