//! Log sinks - where formatted records end up
//!
//! Enables dependency injection: tracing in production,
//! MemorySink or NoopSink in tests.
//!
//! Key types:
//! - `LogSink`: Trait for writing one `(tag, message)` record
//! - `TracingSink`: Default, one `tracing::debug!` event per record
//! - `ConsoleSink`: Logcat-style lines on stderr
//! - `MemorySink`: Ordered in-memory capture
//! - `NoopSink`: Discards everything

use std::fmt;
use std::sync::Arc;

use colored::Colorize;
use parking_lot::Mutex;

/// One record handed to a sink. Never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub tag: String,
    pub message: String,
}

impl LogRecord {
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D/{}: {}", self.tag, self.message)
    }
}

/// Destination for log records
///
/// Each `write` call must be atomic with respect to other writes; no ordering
/// is expected across threads.
pub trait LogSink: Send + Sync {
    fn write(&self, tag: &str, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write(&self, tag: &str, message: &str) {
        (**self).write(tag, message)
    }
}

/// Forwards records to `tracing` at DEBUG level on target `stream_debug`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, tag: &str, message: &str) {
        tracing::debug!(target: "stream_debug", tag = %tag, "{}", message);
    }
}

/// Prints `D/<tag>: <message>` lines to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&self, tag: &str, message: &str) {
        // eprintln! locks stderr for the whole line
        eprintln!("{}{} {}", "D/".dimmed(), format!("{tag}:").cyan().bold(), message);
    }
}

/// Captures records in write order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages only, in write order
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    /// Remove and return everything written so far
    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn write(&self, tag: &str, message: &str) {
        self.records.lock().push(LogRecord::new(tag, message));
    }
}

/// No-op sink (zero allocation)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write(&self, _tag: &str, _message: &str) {}
}
