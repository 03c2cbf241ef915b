//! Event formatting and size-limited emission
//!
//! One lifecycle event becomes a `title + body` message. Messages longer than
//! the sink limit are cut into chunks: the body is split on `\n` (the newline
//! itself is never emitted), every line is cut into pieces of at most
//! `max_message_length - len(title)` characters, and every piece is written
//! with the full title in front.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::config::{DebugConfig, DEFAULT_MAX_MESSAGE_LENGTH};
use crate::event::Event;
use crate::sink::LogSink;
use crate::switch::LoggingSwitch;
use crate::tag::Tag;

/// Errors the adapters can report: `Display` gives the message line,
/// `Debug` the detailed report (causes, backtrace)
///
/// Covers every `std::error::Error` as well as `anyhow::Error` and
/// `Box<dyn Error + Send + Sync>`.
pub trait ErrorReport: fmt::Debug + fmt::Display {}

impl<E: fmt::Debug + fmt::Display + ?Sized> ErrorReport for E {}

/// Data attached to an event
#[derive(Clone, Copy)]
pub enum Payload<'a> {
    None,
    Value(&'a dyn fmt::Display),
    Error {
        type_name: &'static str,
        error: &'a (dyn ErrorReport + 'a),
    },
}

impl<'a> Payload<'a> {
    /// Error payload, remembering the concrete error type for the report
    pub fn error<E: ErrorReport>(error: &'a E) -> Self {
        Self::Error {
            type_name: std::any::type_name::<E>(),
            error,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Message body: empty, the value's text, or a multi-line error report
    pub fn body(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Value(value) => value.to_string(),
            Self::Error { type_name, error } => error_report(type_name, *error),
        }
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Value(value) => f.debug_tuple("Value").field(&value.to_string()).finish(),
            Self::Error { type_name, error } => f
                .debug_struct("Error")
                .field("type_name", type_name)
                .field("error", &error.to_string())
                .finish(),
        }
    }
}

/// `{type}: {message}` followed by the `Debug` report, minus the message
/// it usually starts with
pub fn error_report(type_name: &str, error: &dyn ErrorReport) -> String {
    let message = error.to_string();
    let mut report = format!("{type_name}: {message}");

    let debug = format!("{error:?}");
    let detail = debug
        .strip_prefix(message.as_str())
        .unwrap_or(&debug)
        .trim_start_matches('\n');
    if !detail.is_empty() {
        report.push('\n');
        report.push_str(detail);
    }
    report
}

/// Log title: the bare event name, or `"{name}: "` when a payload follows
pub fn title(event: Event, payload: &Payload<'_>) -> Cow<'static, str> {
    if payload.is_none() {
        Cow::Borrowed(event.name())
    } else {
        Cow::Owned(format!("{}: ", event.name()))
    }
}

/// Cut `body` into virtual lines, then each line into pieces of at most
/// `max_body` characters. Empty lines yield one empty piece.
pub fn split_chunks(body: &str, max_body: usize) -> Vec<&str> {
    let max_body = max_body.max(1);
    let mut chunks = Vec::new();

    for line in body.split('\n') {
        if line.is_empty() {
            chunks.push(line);
            continue;
        }
        let mut rest = line;
        while !rest.is_empty() {
            let cut = rest
                .char_indices()
                .nth(max_body)
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len());
            let (chunk, tail) = rest.split_at(cut);
            chunks.push(chunk);
            rest = tail;
        }
    }
    chunks
}

/// Formats events and writes them to a [`LogSink`]
#[derive(Clone)]
pub struct EventLogger {
    sink: Arc<dyn LogSink>,
    switch: LoggingSwitch,
    max_message_length: usize,
}

impl EventLogger {
    /// Logger on the global switch with the default message limit
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            switch: LoggingSwitch::global(),
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }

    pub fn from_config(sink: Arc<dyn LogSink>, switch: LoggingSwitch, config: &DebugConfig) -> Self {
        Self {
            sink,
            switch,
            max_message_length: config.max_message_length,
        }
    }

    pub fn with_switch(mut self, switch: LoggingSwitch) -> Self {
        self.switch = switch;
        self
    }

    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    pub fn switch(&self) -> &LoggingSwitch {
        &self.switch
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    /// Log one event. No-op when the switch is off.
    pub fn emit(&self, event: Event, tag: &Tag, payload: Payload<'_>) {
        if !self.is_enabled() {
            return;
        }
        let title = title(event, &payload);
        let body = payload.body();
        self.write_chunked(tag, &title, &body);
    }

    /// Write `title + body`, chunked to fit the sink limit
    pub fn write_chunked(&self, tag: &str, title: &str, body: &str) {
        let max_body = self
            .max_message_length
            .saturating_sub(title.chars().count())
            .max(1);

        if body.chars().count() < max_body {
            self.sink.write(tag, &format!("{title}{body}"));
            return;
        }

        for chunk in split_chunks(body, max_body) {
            self.sink.write(tag, &format!("{title}{chunk}"));
        }
    }
}

impl fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLogger")
            .field("enabled", &self.is_enabled())
            .field("max_message_length", &self.max_message_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;

    #[derive(Debug, thiserror::Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[derive(Debug, thiserror::Error)]
    #[error("fetch failed")]
    struct FetchFailed(#[source] SocketClosed);

    fn logger(max: usize) -> (EventLogger, MemorySink) {
        let sink = MemorySink::new();
        let logger = EventLogger::new(Arc::new(sink.clone()))
            .with_switch(LoggingSwitch::new(true))
            .with_max_message_length(max);
        (logger, sink)
    }

    // ═══════════════════════════════════════════════════════════════
    // Titles and bodies
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn event_without_payload_is_bare_title() {
        let (logger, sink) = logger(4000);
        logger.emit(Event::Subscribe, &Tag::new("Main"), Payload::None);
        assert_eq!(sink.messages(), vec!["OnSubscribe"]);
        assert_eq!(sink.records()[0].tag, "Main");
    }

    #[test]
    fn value_payload_is_prefixed_title() {
        let (logger, sink) = logger(4000);
        logger.emit(Event::Next, &Tag::new("Main"), Payload::Value(&42));
        assert_eq!(sink.messages(), vec!["OnNext: 42"]);
    }

    #[test]
    fn empty_value_still_uses_prefixed_title() {
        let (logger, sink) = logger(4000);
        logger.emit(Event::Next, &Tag::new("Main"), Payload::Value(&""));
        assert_eq!(sink.messages(), vec!["OnNext: "]);
    }

    #[test]
    fn error_payload_reports_type_message_and_debug() {
        let (logger, sink) = logger(4000);
        let err = FetchFailed(SocketClosed);
        logger.emit(Event::Error, &Tag::new("Main"), Payload::error(&err));

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("OnError: "));
        assert!(messages[0].ends_with("FetchFailed: fetch failed\nFetchFailed(SocketClosed)"));
    }

    #[test]
    fn anyhow_report_keeps_the_cause_chain() {
        let (logger, sink) = logger(4000);
        let err = anyhow::Error::new(SocketClosed).context("fetch failed");
        logger.emit(Event::Error, &Tag::new("Main"), Payload::error(&err));

        let messages = sink.messages();
        assert!(
            messages[0].starts_with("OnError: anyhow::Error: fetch failed\nCaused by:\n    socket closed"),
            "{}",
            messages[0]
        );
    }

    #[test]
    fn long_error_report_is_chunked_per_line() {
        let (logger, sink) = logger(40);
        let err = anyhow::Error::new(SocketClosed).context("fetch failed");
        logger.emit(Event::Error, &Tag::new("Main"), Payload::error(&err));

        let messages = sink.messages();
        assert!(messages.len() >= 3);
        assert!(messages.iter().all(|m| m.starts_with("OnError: ")));
        assert_eq!(
            &messages[..3],
            &[
                "OnError: anyhow::Error: fetch failed",
                "OnError: Caused by:",
                "OnError:     socket closed",
            ]
        );
    }

    #[test]
    fn debug_equal_to_message_is_not_repeated() {
        struct Plain;

        impl fmt::Display for Plain {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("plain")
            }
        }

        impl fmt::Debug for Plain {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("plain")
            }
        }

        assert_eq!(error_report("app::Plain", &Plain), "app::Plain: plain");
    }

    #[test]
    fn boxed_dyn_errors_are_reportable() {
        let err: Box<dyn std::error::Error + Send + Sync> = "gone".into();
        let payload = Payload::error(&err);
        assert!(payload.body().contains(": gone\n\"gone\""), "{}", payload.body());
    }

    // ═══════════════════════════════════════════════════════════════
    // Switch
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn disabled_switch_writes_nothing() {
        let (logger, sink) = logger(4000);
        logger.switch().set_enabled(false);

        logger.emit(Event::Subscribe, &Tag::new("Main"), Payload::None);
        logger.emit(Event::Error, &Tag::new("Main"), Payload::error(&SocketClosed));
        assert!(sink.is_empty());

        logger.switch().set_enabled(true);
        logger.emit(Event::Subscribe, &Tag::new("Main"), Payload::None);
        assert_eq!(sink.messages(), vec!["OnSubscribe"]);
    }

    // ═══════════════════════════════════════════════════════════════
    // Chunking
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn body_one_below_limit_is_single_record() {
        let (logger, sink) = logger(4000);
        let title = "OnSuccess: ";
        let body = "x".repeat(4000 - title.len() - 1);
        logger.write_chunked("T", title, &body);
        assert_eq!(sink.messages(), vec![format!("{title}{body}")]);
    }

    #[test]
    fn body_at_limit_goes_through_chunker_unchanged() {
        let (logger, sink) = logger(4000);
        let title = "OnSuccess: ";
        let body = "x".repeat(4000 - title.len());
        logger.write_chunked("T", title, &body);
        assert_eq!(sink.messages(), vec![format!("{title}{body}")]);
    }

    #[test]
    fn mixed_lines_split_into_four_records() {
        let (logger, sink) = logger(4000);
        let title = "OnSuccess: ";
        let body = format!(
            "{}\n{}{}{}{}",
            "A".repeat(3000),
            "B".repeat(3989),
            "C".repeat(3000),
            "D".repeat(989),
            "D".repeat(2000)
        );
        logger.write_chunked("T", title, &body);

        assert_eq!(
            sink.messages(),
            vec![
                format!("{title}{}", "A".repeat(3000)),
                format!("{title}{}", "B".repeat(3989)),
                format!("{title}{}{}", "C".repeat(3000), "D".repeat(989)),
                format!("{title}{}", "D".repeat(2000)),
            ]
        );
    }

    #[test]
    fn every_chunk_fits_the_sink() {
        let (logger, sink) = logger(50);
        let body = "word ".repeat(100);
        logger.write_chunked("T", "OnNext: ", &body);
        assert!(sink.len() > 1);
        for message in sink.messages() {
            assert!(message.starts_with("OnNext: "));
            assert!(message.chars().count() <= 50, "{message}");
        }
    }

    #[test]
    fn split_keeps_empty_lines() {
        assert_eq!(split_chunks("ab\n\ncd", 10), vec!["ab", "", "cd"]);
        assert_eq!(split_chunks("ab\n", 10), vec!["ab", ""]);
        assert_eq!(split_chunks("\nab", 10), vec!["", "ab"]);
    }

    #[test]
    fn split_cuts_on_char_boundaries() {
        assert_eq!(split_chunks("ééééé", 2), vec!["éé", "éé", "é"]);
    }

    #[test]
    fn split_with_zero_budget_still_terminates() {
        assert_eq!(split_chunks("abc", 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn oversized_title_degrades_to_single_char_chunks() {
        let (logger, sink) = logger(5);
        logger.write_chunked("T", "OnSuccess: ", "xyz");
        assert_eq!(
            sink.messages(),
            vec!["OnSuccess: x", "OnSuccess: y", "OnSuccess: z"]
        );
    }
}
