use std::sync::mpsc::Sender;

use crate::error::Result;

/// Something that happened on an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound line, without its terminator.
    Line(String),
    /// The transport closed without being asked to.
    Closed,
}

/// A transport event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub session: u64,
    pub event: TransportEvent,
}

impl Inbound {
    /// Shorthand for a line event.
    pub fn line(session: u64, line: impl Into<String>) -> Self {
        Self {
            session,
            event: TransportEvent::Line(line.into()),
        }
    }

    /// Shorthand for a close event.
    pub fn closed(session: u64) -> Self {
        Self {
            session,
            event: TransportEvent::Closed,
        }
    }
}

/// Delivery handle handed to a transport when it is opened.
///
/// Every event sent through a sink carries the sink's session number.
#[derive(Debug, Clone)]
pub struct LineSink {
    session: u64,
    tx: Sender<Inbound>,
}

impl LineSink {
    pub fn new(session: u64, tx: Sender<Inbound>) -> Self {
        Self { session, tx }
    }

    /// Session this sink delivers for.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Forward one inbound line.
    ///
    /// Returns `false` once the receiving side is gone.
    pub fn line(&self, line: impl Into<String>) -> bool {
        self.tx.send(Inbound::line(self.session, line)).is_ok()
    }

    /// Report that the transport closed on its own.
    pub fn closed(&self) -> bool {
        self.tx.send(Inbound::closed(self.session)).is_ok()
    }
}

/// A byte transport that delivers inbound traffic as lines.
///
/// Implementations must not block in `open` for longer than the open itself
/// takes; inbound lines are delivered asynchronously through the sink.
pub trait Transport {
    /// Open the transport. Lines received while open go to `sink`.
    fn open(&mut self, sink: LineSink) -> Result<()>;

    /// Close the transport. Safe to call when already closed.
    fn close(&mut self);

    /// Write raw bytes to the open transport.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Endpoint name used in logs.
    fn name(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, sink: LineSink) -> Result<()> {
        (**self).open(sink)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn sink_tags_events_with_session() {
        let (tx, rx) = mpsc::channel();
        let sink = LineSink::new(7, tx);

        assert!(sink.line("{\"T\":\"Log\"}"));
        assert!(sink.closed());

        assert_eq!(rx.recv().unwrap(), Inbound::line(7, "{\"T\":\"Log\"}"));
        assert_eq!(rx.recv().unwrap(), Inbound::closed(7));
    }

    #[test]
    fn sink_reports_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let sink = LineSink::new(1, tx);
        drop(rx);

        assert!(!sink.line("lost"));
        assert!(!sink.closed());
    }
}
