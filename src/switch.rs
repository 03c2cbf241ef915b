//! Logging on/off switch
//!
//! A best-effort gate read on every emit. Reads and writes use relaxed
//! atomics: a toggle takes effect on the next emit that observes it, with no
//! ordering guarantee relative to emits already running on other threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::config::{parse_bool, ENV_ENABLED};

/// Process-wide switch shared by [`Debugger::global`](crate::Debugger::global)
static GLOBAL: Lazy<LoggingSwitch> = Lazy::new(|| LoggingSwitch::new(initial_state(ENV_ENABLED)));

/// `STREAM_DEBUG_ENABLED` when set to a valid boolean, enabled otherwise
fn initial_state(key: &str) -> bool {
    match std::env::var(key) {
        Ok(raw) => parse_bool(key, &raw).unwrap_or_else(|e| {
            tracing::warn!(target: "stream_debug", error = %e, "ignoring invalid {key}");
            true
        }),
        Err(_) => true,
    }
}

/// Cloneable handle to a shared enabled flag
#[derive(Debug, Clone)]
pub struct LoggingSwitch {
    enabled: Arc<AtomicBool>,
}

impl LoggingSwitch {
    /// Create an independent switch
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// Handle to the process-wide switch (starts from `STREAM_DEBUG_ENABLED`, default on)
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for LoggingSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Globally enable or disable logging for every attachment using the global switch
pub fn set_logging_enabled(enabled: bool) {
    GLOBAL.set_enabled(enabled);
}

/// Current state of the global switch
pub fn is_logging_enabled() -> bool {
    GLOBAL.is_enabled()
}
