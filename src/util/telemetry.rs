//! Telemetry helpers for structured logging and tracing.
//!
//! Internal lifecycle events go straight to `tracing`. Caller-facing diagnostics
//! (submission failures, scheduler misconfiguration, completion progress) go through
//! the injectable [`DiagnosticLog`] so embedders can capture or silence them.

use parking_lot::Mutex;

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Best-effort diagnostic sink. Implementations must never panic.
pub trait DiagnosticLog: Send + Sync {
    /// Record a debug-level message.
    fn debug(&self, msg: &str);
    /// Record an error-level message.
    fn error(&self, msg: &str);
}

/// Forwards diagnostics to `tracing` under the `taskgate` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl DiagnosticLog for TracingLog {
    fn debug(&self, msg: &str) {
        tracing::debug!(target: "taskgate", "{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "taskgate", "{msg}");
    }
}

/// Discards everything. Stands in for an absent logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl DiagnosticLog for NullLog {
    fn debug(&self, _msg: &str) {}

    fn error(&self, _msg: &str) {}
}

/// Severity of a captured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level diagnostics.
    Debug,
    /// Error-level diagnostics.
    Error,
}

/// In-memory sink for tests and embedding; keeps every message in order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured entries.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().clone()
    }

    /// Captured error messages.
    pub fn errors(&self) -> Vec<String> {
        self.by_level(LogLevel::Error)
    }

    /// Captured debug messages.
    pub fn debugs(&self) -> Vec<String> {
        self.by_level(LogLevel::Debug)
    }

    fn by_level(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl DiagnosticLog for MemoryLog {
    fn debug(&self, msg: &str) {
        self.entries.lock().push((LogLevel::Debug, msg.to_owned()));
    }

    fn error(&self, msg: &str) {
        self.entries.lock().push((LogLevel::Error, msg.to_owned()));
    }
}
