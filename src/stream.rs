//! Push-many attachments: instrumented `Stream<Item = Result<T, E>>`
//!
//! - `Ok(v)` logs OnNext
//! - the first `Err(e)` logs OnTerminate, OnError; whatever the inner stream
//!   yields afterwards is forwarded unchanged without further logging
//! - the end of the inner stream logs OnTerminate, OnComplete
//! - dropping an active stream early logs OnCancel (or OnDispose for
//!   [`Shape::Unbounded`] attachments)

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::ready;
use futures::stream::{FusedStream, Stream};
use pin_project_lite::pin_project;

use crate::debugger::Debugger;
use crate::error::{DebugError, Result};
use crate::event::Shape;
use crate::lifecycle::{DebugRender, Lifecycle, MapRender, Render, Rendered};
use crate::logger::{ErrorReport, Payload};
use crate::tag::{CallStack, Tag};

pin_project! {
    /// Stream returned by the [`DebugStreamExt`] attachment methods
    #[must_use = "streams do nothing unless polled"]
    pub struct DebugStream<S, R> {
        #[pin]
        stream: S,
        lifecycle: Lifecycle,
        render: R,
    }
}

impl<S, R> DebugStream<S, R> {
    pub fn tag(&self) -> &Tag {
        self.lifecycle.tag()
    }

    pub fn shape(&self) -> Shape {
        self.lifecycle.shape()
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl<S, T, E, R> Stream for DebugStream<S, R>
where
    S: Stream<Item = std::result::Result<T, E>>,
    E: ErrorReport,
    R: Render<T>,
{
    type Item = std::result::Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        this.lifecycle.subscribe();

        let item = ready!(this.stream.poll_next(cx));
        match &item {
            Some(Ok(value)) => this.lifecycle.next(&Rendered::new(value, &*this.render)),
            Some(Err(error)) => this.lifecycle.fail(Payload::error(error)),
            None => this.lifecycle.complete(),
        }
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<S, T, E, R> FusedStream for DebugStream<S, R>
where
    S: FusedStream<Item = std::result::Result<T, E>>,
    E: ErrorReport,
    R: Render<T>,
{
    fn is_terminated(&self) -> bool {
        self.stream.is_terminated()
    }
}

/// A clone is a new subscription to the same attachment
impl<S: Clone, R: Clone> Clone for DebugStream<S, R> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
            lifecycle: self.lifecycle.resubscribe(),
            render: self.render.clone(),
        }
    }
}

impl<S, R> fmt::Debug for DebugStream<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugStream")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

fn try_attach<S, R>(
    stream: S,
    debugger: &Debugger,
    shape: Shape,
    stack: &CallStack,
    tag: Option<&str>,
    render: R,
) -> Result<DebugStream<S, R>> {
    if !shape.pairs_terminate() {
        return Err(DebugError::Config {
            reason: format!("{shape:?} is not a stream shape (use Unbounded or Backpressured)"),
        });
    }
    let tag = debugger.resolve_tag(stack, tag)?;
    Ok(DebugStream {
        stream,
        lifecycle: debugger.lifecycle(shape, tag),
        render,
    })
}

#[track_caller]
fn attach<S, R>(
    stream: S,
    debugger: &Debugger,
    shape: Shape,
    stack: &CallStack,
    tag: Option<&str>,
    render: R,
) -> DebugStream<S, R> {
    match try_attach(stream, debugger, shape, stack, tag, render) {
        Ok(stream) => stream,
        Err(e) => panic!("stream-debug: cannot attach instrumentation: {e}"),
    }
}

/// Attachment methods for fallible streams
///
/// The tag is resolved once, when the method is called; every clone of the
/// returned stream logs under it. The base tag comes from the caller's
/// source file (`src/ui/main_view.rs` logs as `main_view`).
///
/// # Panics
///
/// The non-`try` methods panic if the tag cannot be resolved (a debugger
/// configured with a frame depth beyond the captured stack).
pub trait DebugStreamExt: Stream + Sized {
    /// Log lifecycle events as a backpressured stage (early drop logs OnCancel)
    #[track_caller]
    fn debug<T, E>(self) -> DebugStream<Self, DebugRender>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            Shape::Backpressured,
            &CallStack::caller(),
            None,
            DebugRender,
        )
    }

    /// [`debug`](Self::debug) with `"{base}: {tag}"` as the tag
    #[track_caller]
    fn debug_tagged<T, E>(self, tag: &str) -> DebugStream<Self, DebugRender>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            Shape::Backpressured,
            &CallStack::caller(),
            Some(tag),
            DebugRender,
        )
    }

    /// Log lifecycle events as an unbounded stage (early drop logs OnDispose)
    #[track_caller]
    fn debug_unbounded<T, E>(self) -> DebugStream<Self, DebugRender>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            Shape::Unbounded,
            &CallStack::caller(),
            None,
            DebugRender,
        )
    }

    #[track_caller]
    fn debug_unbounded_tagged<T, E>(self, tag: &str) -> DebugStream<Self, DebugRender>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            Shape::Unbounded,
            &CallStack::caller(),
            Some(tag),
            DebugRender,
        )
    }

    /// Like [`debug`](Self::debug), logging `map(&value)` instead of the value
    #[track_caller]
    fn debug_map<T, E, M, D>(self, tag: Option<&str>, map: M) -> DebugStream<Self, MapRender<M>>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        E: ErrorReport,
        M: Fn(&T) -> D,
        D: fmt::Display,
    {
        attach(
            self,
            Debugger::global(),
            Shape::Backpressured,
            &CallStack::caller(),
            tag,
            MapRender(map),
        )
    }

    /// [`debug_map`](Self::debug_map) logging through `debugger`
    #[track_caller]
    fn debug_map_with<T, E, M, D>(
        self,
        debugger: &Debugger,
        tag: Option<&str>,
        map: M,
    ) -> DebugStream<Self, MapRender<M>>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        E: ErrorReport,
        M: Fn(&T) -> D,
        D: fmt::Display,
    {
        attach(
            self,
            debugger,
            Shape::Backpressured,
            &CallStack::caller(),
            tag,
            MapRender(map),
        )
    }

    /// Backpressured attachment logging through `debugger`
    #[track_caller]
    fn debug_with<T, E>(self, debugger: &Debugger, tag: Option<&str>) -> DebugStream<Self, DebugRender>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            debugger,
            Shape::Backpressured,
            &CallStack::caller(),
            tag,
            DebugRender,
        )
    }

    /// Unbounded attachment logging through `debugger`
    #[track_caller]
    fn debug_unbounded_with<T, E>(
        self,
        debugger: &Debugger,
        tag: Option<&str>,
    ) -> DebugStream<Self, DebugRender>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            debugger,
            Shape::Unbounded,
            &CallStack::caller(),
            tag,
            DebugRender,
        )
    }

    /// Fully explicit attachment; fails instead of panicking
    fn try_debug_with<T, E>(
        self,
        debugger: &Debugger,
        shape: Shape,
        stack: &CallStack,
        tag: Option<&str>,
    ) -> Result<DebugStream<Self, DebugRender>>
    where
        Self: Stream<Item = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        try_attach(self, debugger, shape, stack, tag, DebugRender)
    }
}

impl<S: Stream> DebugStreamExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::tag::CallFrame;
    use futures::executor::block_on;
    use futures::stream::{self, StreamExt};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;

    #[derive(Debug, Clone, thiserror::Error)]
    #[error("upstream failed")]
    struct Upstream;

    fn setup() -> (Debugger, MemorySink) {
        let sink = MemorySink::new();
        (Debugger::new(sink.clone()), sink)
    }

    #[test]
    fn natural_completion_logs_terminate_then_complete() {
        let (debugger, sink) = setup();
        let items: Vec<_> = block_on(
            stream::iter(vec![Ok::<_, Infallible>(1), Ok(2), Ok(3)])
                .debug_with(&debugger, None)
                .collect(),
        );

        assert_eq!(items.len(), 3);
        assert_eq!(
            sink.messages(),
            vec![
                "OnSubscribe",
                "OnNext: 1",
                "OnNext: 2",
                "OnNext: 3",
                "OnTerminate",
                "OnComplete"
            ]
        );
        assert!(sink.records().iter().all(|r| r.tag == "stream"));
    }

    #[test]
    fn items_after_an_error_are_forwarded_silently() {
        let (debugger, sink) = setup();
        let plain: Vec<_> =
            block_on(stream::iter(vec![Ok(1), Err(Upstream), Ok(2), Ok(3)]).collect());
        let items: Vec<_> = block_on(
            stream::iter(vec![Ok(1), Err(Upstream), Ok(2), Ok(3)])
                .debug_with(&debugger, Some("numbers"))
                .collect(),
        );

        assert_eq!(items.len(), plain.len());
        assert!(items[1].is_err());
        assert_eq!(items[3].as_ref().unwrap(), &3);

        let messages = sink.messages();
        assert_eq!(&messages[..3], &["OnSubscribe", "OnNext: 1", "OnTerminate"]);
        assert!(messages[3].starts_with("OnError: "));
        assert!(messages[3].contains("Upstream: upstream failed"));
        assert_eq!(messages.len(), 4);
        assert_eq!(sink.records()[0].tag, "stream: numbers");
    }

    #[test]
    fn anyhow_streams_can_be_debugged() {
        let (debugger, sink) = setup();
        let items: Vec<_> = block_on(
            stream::iter(vec![
                Ok::<u8, anyhow::Error>(1),
                Err(anyhow::anyhow!("feed broke")),
                Ok(2),
            ])
            .debug_with(&debugger, None)
            .collect(),
        );

        assert_eq!(items.len(), 3);
        let messages = sink.messages();
        assert_eq!(messages.len(), 4);
        assert!(messages[3].starts_with("OnError: anyhow::Error: feed broke"));
    }

    #[test]
    fn early_drop_logs_cancel() {
        let (debugger, sink) = setup();
        let mut s = stream::iter(vec![Ok::<_, Infallible>("a"), Ok("b")]).debug_with(&debugger, None);
        assert!(block_on(s.next()).is_some());
        drop(s);

        assert_eq!(
            sink.messages(),
            vec!["OnSubscribe", "OnNext: \"a\"", "OnCancel"]
        );
    }

    #[test]
    fn unbounded_shape_reports_dispose() {
        let (debugger, sink) = setup();
        let mut s = stream::pending::<std::result::Result<u8, Infallible>>()
            .try_debug_with(&debugger, Shape::Unbounded, &CallStack::caller(), None)
            .unwrap();
        assert!(s.next().now_or_never().is_none());
        drop(s);

        assert_eq!(sink.messages(), vec!["OnSubscribe", "OnDispose"]);
    }

    #[test]
    fn never_polled_stream_logs_nothing() {
        let (debugger, sink) = setup();
        let s = stream::iter(vec![Ok::<_, Infallible>(1)]).debug_with(&debugger, None);
        drop(s);
        assert!(sink.is_empty());
    }

    #[test]
    fn clones_share_tag_and_log_separately() {
        let (debugger, sink) = setup();
        let s = stream::iter(vec![Ok::<_, Infallible>(7)]).debug_with(&debugger, Some("shared"));
        let again = s.clone();
        assert_eq!(s.tag(), again.tag());

        let _: Vec<_> = block_on(s.collect());
        let _: Vec<_> = block_on(again.collect());

        let messages = sink.messages();
        assert_eq!(messages.len(), 8);
        assert_eq!(&messages[..4], &messages[4..]);
        assert!(sink.records().iter().all(|r| r.tag == "stream: shared"));
    }

    #[test]
    fn fused_state_follows_the_inner_stream() {
        let (debugger, sink) = setup();
        let mut s = stream::iter(vec![Err::<u8, _>(Upstream), Ok(1)])
            .fuse()
            .debug_with(&debugger, None);

        assert!(block_on(s.next()).unwrap().is_err());
        assert!(!s.is_terminated());
        assert_eq!(s.size_hint(), (1, Some(1)));
        assert_eq!(block_on(s.next()).unwrap().unwrap(), 1);
        assert!(block_on(s.next()).is_none());
        assert!(s.is_terminated());
        drop(s);

        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn mapped_values_are_rendered_with_display() {
        let sink = MemorySink::new();
        let debugger = Debugger::new(sink.clone());
        let stack = CallStack::from(CallFrame::new("app::feed", "src/feed.rs", 1));
        let tag = debugger.resolve_tag(&stack, None).unwrap();
        let s = DebugStream {
            stream: stream::iter(vec![Ok::<_, Infallible>(vec![1, 2, 3])]),
            lifecycle: debugger.lifecycle(Shape::Backpressured, tag),
            render: MapRender(|v: &Vec<i32>| format!("{} items", v.len())),
        };
        let _: Vec<_> = block_on(s.collect());

        assert_eq!(sink.messages()[1], "OnNext: 3 items");
        assert_eq!(sink.records()[1].tag, "feed");
    }

    #[test]
    fn future_shapes_are_rejected_for_streams() {
        let (debugger, _sink) = setup();
        let err = stream::iter(vec![Ok::<_, Infallible>(1)])
            .try_debug_with(&debugger, Shape::Single, &CallStack::caller(), None)
            .unwrap_err();
        assert!(matches!(err, DebugError::Config { .. }));
    }
}
