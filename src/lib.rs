//! stream-debug - lifecycle logging for async streams and futures
//!
//! Attach instrumentation to any fallible `Stream` or `Future` and every
//! lifecycle event (subscribe, items, terminal events, early drop) is logged
//! under a tag derived from where the attachment was made.
//!
//! ```ignore
//! use stream_debug::DebugStreamExt;
//!
//! let words = futures::stream::iter(["One", "Two"].map(Ok::<_, std::io::Error>))
//!     .debug_tagged("Words");
//! ```

pub mod config;
pub mod debugger;
pub mod error;
pub mod event;
pub mod future;
pub mod lifecycle;
pub mod logger;
pub mod sink;
pub mod stream;
pub mod switch;
pub mod tag;

pub use config::DebugConfig;
pub use debugger::{Debugger, DebuggerBuilder};
pub use error::{DebugError, FixSuggestion, Result};
pub use event::{Event, Shape};
pub use future::{CompletionKind, DebugFuture, DebugFutureExt, FutureKind, OptionalKind, SingleKind};
pub use lifecycle::{DebugRender, Lifecycle, MapRender, Render};
pub use logger::{EventLogger, Payload};
pub use sink::{ConsoleSink, LogRecord, LogSink, MemorySink, NoopSink, TracingSink};
pub use stream::{DebugStream, DebugStreamExt};
pub use switch::{is_logging_enabled, set_logging_enabled, LoggingSwitch};
pub use tag::{CallFrame, CallStack, Tag, TagResolver};
