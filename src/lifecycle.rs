//! Per-subscription lifecycle bookkeeping shared by every shape
//!
//! `Lifecycle` turns raw notifications (activation, item, resolution, drop)
//! into logged events following the stage's [`Shape`]:
//! - Subscribe fires once, on the first notification
//! - terminal events and early cancel are mutually exclusive
//! - push-many shapes pair each terminal event with a preceding Terminate
//! - dropping an active, unfinished subscription logs Dispose or Cancel
//!
//! It never buffers or reorders: each call logs inline, in call order.

use std::fmt;

use crate::event::{Event, Shape};
use crate::logger::{EventLogger, Payload};
use crate::tag::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Attached, never polled
    Pending,
    /// Subscribe logged, no terminal event yet
    Active,
    /// Terminal event logged
    Finished,
}

/// Lifecycle state of one subscription
pub struct Lifecycle {
    shape: Shape,
    tag: Tag,
    logger: EventLogger,
    phase: Phase,
}

impl Lifecycle {
    pub fn new(shape: Shape, tag: Tag, logger: EventLogger) -> Self {
        Self {
            shape,
            tag,
            logger,
            phase: Phase::Pending,
        }
    }

    /// New subscription to the same attachment: same tag, fresh state
    pub fn resubscribe(&self) -> Self {
        Self::new(self.shape, self.tag.clone(), self.logger.clone())
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Log Subscribe on the first call, no-op afterwards
    pub fn subscribe(&mut self) {
        if self.phase == Phase::Pending {
            self.phase = Phase::Active;
            self.emit(Event::Subscribe, Payload::None);
        }
    }

    pub fn next(&mut self, value: &dyn fmt::Display) {
        if self.is_active() {
            self.emit(Event::Next, Payload::Value(value));
        }
    }

    /// Resolved with a value
    pub fn succeed(&mut self, value: &dyn fmt::Display) {
        self.finish(Event::Success, Payload::Value(value));
    }

    /// Resolved without a value
    pub fn complete(&mut self) {
        self.finish(Event::Complete, Payload::None);
    }

    pub fn fail(&mut self, error: Payload<'_>) {
        self.finish(Event::Error, error);
    }

    /// Log the early-cancel event if the subscription is still running
    pub fn cancel(&mut self) {
        if self.is_active() {
            self.phase = Phase::Finished;
            self.emit(self.shape.early_cancel(), Payload::None);
        }
    }

    fn finish(&mut self, event: Event, payload: Payload<'_>) {
        if !self.is_active() {
            return;
        }
        self.phase = Phase::Finished;
        if self.shape.pairs_terminate() {
            self.emit(Event::Terminate, Payload::None);
        }
        self.emit(event, payload);
    }

    fn emit(&self, event: Event, payload: Payload<'_>) {
        debug_assert!(
            self.shape.supports(event),
            "{event} is not part of the {:?} vocabulary",
            self.shape
        );
        self.logger.emit(event, &self.tag, payload);
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("shape", &self.shape)
            .field("tag", &self.tag)
            .field("phase", &self.phase)
            .finish()
    }
}

/// Renders payload values for log bodies
pub trait Render<T: ?Sized> {
    fn render(&self, value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Renders values with their `Debug` representation
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugRender;

impl<T: fmt::Debug + ?Sized> Render<T> for DebugRender {
    fn render(&self, value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{value:?}")
    }
}

/// Maps each value before rendering it with `Display`
#[derive(Clone, Copy)]
pub struct MapRender<M>(pub M);

impl<T, D, M> Render<T> for MapRender<M>
where
    T: ?Sized,
    M: Fn(&T) -> D,
    D: fmt::Display,
{
    fn render(&self, value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", (self.0)(value))
    }
}

impl<M> fmt::Debug for MapRender<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapRender")
    }
}

/// Lazily rendered value: formatting runs only when the logger is enabled
pub struct Rendered<'a, T: ?Sized, R> {
    value: &'a T,
    render: &'a R,
}

impl<'a, T: ?Sized, R> Rendered<'a, T, R> {
    pub fn new(value: &'a T, render: &'a R) -> Self {
        Self { value, render }
    }
}

impl<T: ?Sized, R: Render<T>> fmt::Display for Rendered<'_, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render.render(self.value, f)
    }
}
