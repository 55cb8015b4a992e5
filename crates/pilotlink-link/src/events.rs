use std::sync::mpsc::Sender;

use serde_json::{Map, Value};
use tracing::debug;

use crate::pose::Pose;

/// Notification the driver emits to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The board reported in and accepts commands. Emitted once.
    Ready,
    /// The board reported a new pose.
    Pose(Pose),
    /// A generic board event, carrying the complete message.
    Event(Map<String, Value>),
}

impl LinkEvent {
    /// Notification name as hosts know it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Pose(_) => "pose",
            Self::Event(_) => "event",
        }
    }
}

/// Receiver of driver notifications, supplied at construction.
pub trait EventSink {
    fn emit(&mut self, event: LinkEvent);
}

/// Collects events in order.
impl EventSink for Vec<LinkEvent> {
    fn emit(&mut self, event: LinkEvent) {
        self.push(event);
    }
}

/// Forwards events to another thread. Events are dropped once the receiver
/// is gone.
impl EventSink for Sender<LinkEvent> {
    fn emit(&mut self, event: LinkEvent) {
        let name = event.name();
        if self.send(event).is_err() {
            debug!(event = name, "event receiver gone, dropping notification");
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: LinkEvent) {
        (**self).emit(event)
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(LinkEvent)> EventSink for FnSink<F> {
    fn emit(&mut self, event: LinkEvent) {
        (self.0)(event)
    }
}
