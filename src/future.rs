//! Single-shot attachments: instrumented futures
//!
//! | Output                 | Kind             | Resolution logs           |
//! |------------------------|------------------|---------------------------|
//! | `Result<T, E>`         | [`SingleKind`]     | OnSuccess / OnError       |
//! | `Result<Option<T>, E>` | [`OptionalKind`]   | OnSuccess, OnComplete / OnError |
//! | `Result<(), E>`        | [`CompletionKind`] | OnComplete / OnError      |
//!
//! Dropping a polled, unresolved future logs OnDispose.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::FusedFuture;
use futures::ready;
use pin_project_lite::pin_project;

use crate::debugger::Debugger;
use crate::error::Result;
use crate::event::Shape;
use crate::lifecycle::{DebugRender, Lifecycle, MapRender, Render, Rendered};
use crate::logger::{ErrorReport, Payload};
use crate::tag::{CallStack, Tag};

/// Output kind of an instrumented future
pub trait FutureKind: Copy {
    const SHAPE: Shape;
}

/// `Result<T, E>`: resolves with exactly one value
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleKind;

/// `Result<Option<T>, E>`: resolves with a value or empty
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalKind;

/// `Result<(), E>`: resolves with no value
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionKind;

impl FutureKind for SingleKind {
    const SHAPE: Shape = Shape::Single;
}

impl FutureKind for OptionalKind {
    const SHAPE: Shape = Shape::Optional;
}

impl FutureKind for CompletionKind {
    const SHAPE: Shape = Shape::Completion;
}

pin_project! {
    /// Future returned by the [`DebugFutureExt`] attachment methods
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct DebugFuture<F, K, R> {
        #[pin]
        future: F,
        lifecycle: Lifecycle,
        render: R,
        kind: K,
    }
}

impl<F, K: FutureKind, R> DebugFuture<F, K, R> {
    pub fn tag(&self) -> &Tag {
        self.lifecycle.tag()
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn get_ref(&self) -> &F {
        &self.future
    }
}

impl<F, T, E, R> Future for DebugFuture<F, SingleKind, R>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: ErrorReport,
    R: Render<T>,
{
    type Output = std::result::Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        this.lifecycle.subscribe();

        let output = ready!(this.future.poll(cx));
        match &output {
            Ok(value) => this.lifecycle.succeed(&Rendered::new(value, &*this.render)),
            Err(error) => this.lifecycle.fail(Payload::error(error)),
        }
        Poll::Ready(output)
    }
}

impl<F, T, E, R> Future for DebugFuture<F, OptionalKind, R>
where
    F: Future<Output = std::result::Result<Option<T>, E>>,
    E: ErrorReport,
    R: Render<T>,
{
    type Output = std::result::Result<Option<T>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        this.lifecycle.subscribe();

        let output = ready!(this.future.poll(cx));
        match &output {
            Ok(Some(value)) => this.lifecycle.succeed(&Rendered::new(value, &*this.render)),
            Ok(None) => this.lifecycle.complete(),
            Err(error) => this.lifecycle.fail(Payload::error(error)),
        }
        Poll::Ready(output)
    }
}

impl<F, E, R> Future for DebugFuture<F, CompletionKind, R>
where
    F: Future<Output = std::result::Result<(), E>>,
    E: ErrorReport,
{
    type Output = std::result::Result<(), E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        this.lifecycle.subscribe();

        let output = ready!(this.future.poll(cx));
        match &output {
            Ok(()) => this.lifecycle.complete(),
            Err(error) => this.lifecycle.fail(Payload::error(error)),
        }
        Poll::Ready(output)
    }
}

impl<F, K, R> FusedFuture for DebugFuture<F, K, R>
where
    Self: Future,
{
    fn is_terminated(&self) -> bool {
        self.lifecycle.is_finished()
    }
}

/// A clone is a new subscription to the same attachment
impl<F: Clone, K: Copy, R: Clone> Clone for DebugFuture<F, K, R> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            lifecycle: self.lifecycle.resubscribe(),
            render: self.render.clone(),
            kind: self.kind,
        }
    }
}

impl<F, K, R> fmt::Debug for DebugFuture<F, K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugFuture")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

fn try_attach<F, K: FutureKind, R>(
    future: F,
    debugger: &Debugger,
    kind: K,
    stack: &CallStack,
    tag: Option<&str>,
    render: R,
) -> Result<DebugFuture<F, K, R>> {
    let tag = debugger.resolve_tag(stack, tag)?;
    Ok(DebugFuture {
        future,
        lifecycle: debugger.lifecycle(K::SHAPE, tag),
        render,
        kind,
    })
}

#[track_caller]
fn attach<F, K: FutureKind, R>(
    future: F,
    debugger: &Debugger,
    kind: K,
    stack: &CallStack,
    tag: Option<&str>,
    render: R,
) -> DebugFuture<F, K, R> {
    match try_attach(future, debugger, kind, stack, tag, render) {
        Ok(future) => future,
        Err(e) => panic!("stream-debug: cannot attach instrumentation: {e}"),
    }
}

/// Attachment methods for fallible futures
///
/// # Panics
///
/// The non-`try` methods panic if the tag cannot be resolved.
pub trait DebugFutureExt: Future + Sized {
    #[track_caller]
    fn debug_single<T, E>(self) -> DebugFuture<Self, SingleKind, DebugRender>
    where
        Self: Future<Output = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(self, Debugger::global(), SingleKind, &CallStack::caller(), None, DebugRender)
    }

    #[track_caller]
    fn debug_single_tagged<T, E>(self, tag: &str) -> DebugFuture<Self, SingleKind, DebugRender>
    where
        Self: Future<Output = std::result::Result<T, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            SingleKind,
            &CallStack::caller(),
            Some(tag),
            DebugRender,
        )
    }

    #[track_caller]
    fn debug_optional<T, E>(self) -> DebugFuture<Self, OptionalKind, DebugRender>
    where
        Self: Future<Output = std::result::Result<Option<T>, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(self, Debugger::global(), OptionalKind, &CallStack::caller(), None, DebugRender)
    }

    #[track_caller]
    fn debug_optional_tagged<T, E>(self, tag: &str) -> DebugFuture<Self, OptionalKind, DebugRender>
    where
        Self: Future<Output = std::result::Result<Option<T>, E>>,
        T: fmt::Debug,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            OptionalKind,
            &CallStack::caller(),
            Some(tag),
            DebugRender,
        )
    }

    #[track_caller]
    fn debug_completion<E>(self) -> DebugFuture<Self, CompletionKind, DebugRender>
    where
        Self: Future<Output = std::result::Result<(), E>>,
        E: ErrorReport,
    {
        attach(self, Debugger::global(), CompletionKind, &CallStack::caller(), None, DebugRender)
    }

    #[track_caller]
    fn debug_completion_tagged<E>(self, tag: &str) -> DebugFuture<Self, CompletionKind, DebugRender>
    where
        Self: Future<Output = std::result::Result<(), E>>,
        E: ErrorReport,
    {
        attach(
            self,
            Debugger::global(),
            CompletionKind,
            &CallStack::caller(),
            Some(tag),
            DebugRender,
        )
    }

    /// Single-value attachment logging `map(&value)` instead of the value
    #[track_caller]
    fn debug_single_map<T, E, M, D>(
        self,
        tag: Option<&str>,
        map: M,
    ) -> DebugFuture<Self, SingleKind, MapRender<M>>
    where
        Self: Future<Output = std::result::Result<T, E>>,
        E: ErrorReport,
        M: Fn(&T) -> D,
        D: fmt::Display,
    {
        attach(self, Debugger::global(), SingleKind, &CallStack::caller(), tag, MapRender(map))
    }

    /// Attachment of the given kind logging through `debugger`
    #[track_caller]
    fn debug_with<K: FutureKind>(
        self,
        debugger: &Debugger,
        kind: K,
        tag: Option<&str>,
    ) -> DebugFuture<Self, K, DebugRender> {
        attach(self, debugger, kind, &CallStack::caller(), tag, DebugRender)
    }

    /// Fully explicit attachment; fails instead of panicking
    fn try_debug_with<K: FutureKind>(
        self,
        debugger: &Debugger,
        kind: K,
        stack: &CallStack,
        tag: Option<&str>,
    ) -> Result<DebugFuture<Self, K, DebugRender>> {
        try_attach(self, debugger, kind, stack, tag, DebugRender)
    }
}

impl<F: Future> DebugFutureExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use futures::executor::block_on;
    use futures::future::{self, FutureExt};
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;

    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    fn setup() -> (Debugger, MemorySink) {
        let sink = MemorySink::new();
        (Debugger::new(sink.clone()), sink)
    }

    #[test]
    fn single_success() {
        let (debugger, sink) = setup();
        let out = block_on(
            future::ready(Ok::<_, Infallible>("done")).debug_with(&debugger, SingleKind, None),
        );
        assert_eq!(out.unwrap(), "done");
        assert_eq!(sink.messages(), vec!["OnSubscribe", "OnSuccess: \"done\""]);
        assert_eq!(sink.records()[0].tag, "future");
    }

    #[test]
    fn single_error_has_no_terminate() {
        let (debugger, sink) = setup();
        let out = block_on(
            future::ready(Err::<u8, _>(NotFound)).debug_with(&debugger, SingleKind, Some("user")),
        );
        assert!(out.is_err());

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].starts_with("OnError: "));
        assert!(messages[1].contains("NotFound: not found"));
        assert_eq!(sink.records()[1].tag, "future: user");
    }

    #[test]
    fn boxed_dyn_error_future_can_be_debugged() {
        let (debugger, sink) = setup();
        let out = block_on(
            async { Err::<u8, Box<dyn std::error::Error + Send + Sync>>("timed out".into()) }
                .debug_with(&debugger, SingleKind, None),
        );

        assert_eq!(out.unwrap_err().to_string(), "timed out");
        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].starts_with("OnError: alloc::boxed::Box<dyn "));
        assert!(messages[1].contains(": timed out\n"));
    }

    #[test]
    fn optional_empty_completes() {
        let (debugger, sink) = setup();
        let out = block_on(
            future::ready(Ok::<Option<u8>, Infallible>(None))
                .debug_with(&debugger, OptionalKind, None),
        );
        assert_eq!(out.unwrap(), None);
        assert_eq!(sink.messages(), vec!["OnSubscribe", "OnComplete"]);
    }

    #[test]
    fn optional_value_succeeds() {
        let (debugger, sink) = setup();
        let out = block_on(
            future::ready(Ok::<_, Infallible>(Some(5))).debug_with(&debugger, OptionalKind, None),
        );
        assert_eq!(out.unwrap(), Some(5));
        assert_eq!(sink.messages(), vec!["OnSubscribe", "OnSuccess: 5"]);
    }

    #[test]
    fn completion_logs_complete() {
        let (debugger, sink) = setup();
        block_on(future::ready(Ok::<(), Infallible>(())).debug_with(&debugger, CompletionKind, None))
            .unwrap();
        assert_eq!(sink.messages(), vec!["OnSubscribe", "OnComplete"]);
    }

    #[test]
    fn pending_future_dropped_after_poll_disposes() {
        let (debugger, sink) = setup();
        let mut fut = future::pending::<std::result::Result<u8, Infallible>>()
            .debug_with(&debugger, SingleKind, None);
        assert!((&mut fut).now_or_never().is_none());
        assert!(!fut.is_terminated());
        drop(fut);
        assert_eq!(sink.messages(), vec!["OnSubscribe", "OnDispose"]);
    }

    #[test]
    fn unpolled_future_logs_nothing() {
        let (debugger, sink) = setup();
        drop(future::ready(Ok::<(), Infallible>(())).debug_with(&debugger, CompletionKind, None));
        assert!(sink.is_empty());
    }

    #[test]
    fn resolved_future_is_terminated() {
        let (debugger, sink) = setup();
        let mut fut = future::ready(Ok::<_, Infallible>(1)).debug_with(&debugger, SingleKind, None);
        assert!((&mut fut).now_or_never().is_some());
        assert!(fut.is_terminated());
        drop(fut);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn kind_maps_to_shape() {
        assert_eq!(SingleKind::SHAPE, Shape::Single);
        assert_eq!(OptionalKind::SHAPE, Shape::Optional);
        assert_eq!(CompletionKind::SHAPE, Shape::Completion);
    }
}
