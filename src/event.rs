//! Lifecycle event vocabulary and per-shape capability table
//!
//! - Event: the eight lifecycle notifications, with their log titles
//! - Shape: the five stage kinds, each exposing the subset of events it may fire

use std::fmt;

/// Lifecycle notification logged for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Subscribe,
    Next,
    Success,
    Error,
    Complete,
    Terminate,
    Dispose,
    Cancel,
}

impl Event {
    /// Name used as the log title
    pub const fn name(self) -> &'static str {
        match self {
            Self::Subscribe => "OnSubscribe",
            Self::Next => "OnNext",
            Self::Success => "OnSuccess",
            Self::Error => "OnError",
            Self::Complete => "OnComplete",
            Self::Terminate => "OnTerminate",
            Self::Dispose => "OnDispose",
            Self::Cancel => "OnCancel",
        }
    }

    /// Dispose or Cancel
    pub const fn is_early_cancel(self) -> bool {
        matches!(self, Self::Dispose | Self::Cancel)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event vocabulary of an instrumented stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Push-many without backpressure (channel-fed streams); early cancel logs Dispose
    Unbounded,
    /// Push-many with backpressure (pull-based streams); early cancel logs Cancel
    Backpressured,
    /// Exactly one value or an error
    Single,
    /// At most one value or an error
    Optional,
    /// Completion or an error, no value
    Completion,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Unbounded,
        Shape::Backpressured,
        Shape::Single,
        Shape::Optional,
        Shape::Completion,
    ];

    /// Every event this shape may log
    pub const fn events(self) -> &'static [Event] {
        use Event::*;
        match self {
            Self::Unbounded => &[Subscribe, Next, Error, Complete, Terminate, Dispose],
            Self::Backpressured => &[Subscribe, Next, Error, Complete, Terminate, Cancel],
            Self::Single => &[Subscribe, Success, Error, Dispose],
            Self::Optional => &[Subscribe, Success, Error, Complete, Dispose],
            Self::Completion => &[Subscribe, Error, Complete, Dispose],
        }
    }

    pub fn supports(self, event: Event) -> bool {
        self.events().contains(&event)
    }

    /// Event logged when a subscription is dropped before its terminal event
    pub const fn early_cancel(self) -> Event {
        match self {
            Self::Backpressured => Event::Cancel,
            _ => Event::Dispose,
        }
    }

    /// Push-many shapes pair each terminal event with Terminate
    pub const fn pairs_terminate(self) -> bool {
        matches!(self, Self::Unbounded | Self::Backpressured)
    }
}
