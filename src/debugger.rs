//! Debugger - the bundle every attachment logs through
//!
//! Holds the [`EventLogger`] (sink + switch + message limit) and the
//! [`TagResolver`]. Cheap to clone; clones share everything.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::config::DebugConfig;
use crate::error::Result;
use crate::event::Shape;
use crate::lifecycle::Lifecycle;
use crate::logger::EventLogger;
use crate::sink::{LogSink, TracingSink};
use crate::switch::LoggingSwitch;
use crate::tag::{CallStack, Tag, TagResolver};

static GLOBAL: Lazy<Debugger> = Lazy::new(|| {
    let config = DebugConfig::default()
        .with_env_overrides()
        .unwrap_or_else(|e| {
            tracing::warn!(
                target: "stream_debug",
                error = %e,
                "ignoring invalid STREAM_DEBUG_* environment"
            );
            DebugConfig::default()
        });
    // The switch reads STREAM_DEBUG_ENABLED itself when first touched
    Debugger::from_parts(&config, Arc::new(TracingSink), LoggingSwitch::global())
});

struct Inner {
    logger: EventLogger,
    resolver: TagResolver,
}

/// Shared instrumentation settings
#[derive(Clone)]
pub struct Debugger {
    inner: Arc<Inner>,
}

impl Debugger {
    /// Default debugger: tracing sink, global switch, default config
    /// (plus `STREAM_DEBUG_*` environment overrides)
    pub fn global() -> &'static Debugger {
        &GLOBAL
    }

    pub fn builder() -> DebuggerBuilder {
        DebuggerBuilder::default()
    }

    /// Debugger writing to `sink` with its own switch and default config
    pub fn new(sink: impl LogSink + 'static) -> Self {
        let config = DebugConfig::default();
        Self::from_parts(&config, Arc::new(sink), LoggingSwitch::new(config.enabled))
    }

    fn from_parts(config: &DebugConfig, sink: Arc<dyn LogSink>, switch: LoggingSwitch) -> Self {
        Self {
            inner: Arc::new(Inner {
                logger: EventLogger::from_config(sink, switch, config),
                resolver: TagResolver::from_config(config),
            }),
        }
    }

    pub fn logger(&self) -> &EventLogger {
        &self.inner.logger
    }

    pub fn resolver(&self) -> &TagResolver {
        &self.inner.resolver
    }

    pub fn switch(&self) -> &LoggingSwitch {
        self.inner.logger.switch()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.switch().set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.switch().is_enabled()
    }

    /// Resolve the tag of a new attachment
    pub fn resolve_tag(&self, stack: &CallStack, explicit: Option<&str>) -> Result<Tag> {
        self.inner.resolver.resolve(stack, explicit)
    }

    /// Fresh lifecycle for an attachment of the given shape
    pub fn lifecycle(&self, shape: Shape, tag: Tag) -> Lifecycle {
        Lifecycle::new(shape, tag, self.inner.logger.clone())
    }
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("logger", &self.inner.logger)
            .field("resolver", &self.inner.resolver)
            .finish()
    }
}

/// Builder for [`Debugger`]
#[derive(Default)]
pub struct DebuggerBuilder {
    config: DebugConfig,
    sink: Option<Arc<dyn LogSink>>,
    switch: Option<LoggingSwitch>,
}

impl DebuggerBuilder {
    pub fn config(mut self, config: DebugConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Share an existing switch (e.g. [`LoggingSwitch::global`]).
    /// Without one, the debugger gets its own switch starting at `config.enabled`.
    pub fn switch(mut self, switch: LoggingSwitch) -> Self {
        self.switch = Some(switch);
        self
    }

    pub fn build(self) -> Result<Debugger> {
        self.config.validate()?;
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink) as Arc<dyn LogSink>);
        let switch = self
            .switch
            .unwrap_or_else(|| LoggingSwitch::new(self.config.enabled));
        Ok(Debugger::from_parts(&self.config, sink, switch))
    }
}
