use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use pilotlink_transport::{Inbound, LineSink, Transport, TransportEvent};
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;

/// Lifecycle transitions reported by [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The transport opened. Writes go through from now on; the link is
    /// usable once it has settled.
    Opened { session: u64 },
    /// The open failed. Another attempt is due at `due`.
    RetryScheduled { due: Instant },
    /// The settle delay after an open has elapsed.
    Settled,
    /// The transport closed on its own. A retry is scheduled.
    Lost,
}

/// Result of feeding one inbound transport event to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A line for the protocol layer.
    Line(String),
    /// The transport went away; see [`ConnectionEvent::Lost`].
    Lost,
    /// A stale or unexpected event that was dropped.
    Ignored,
}

/// Retry and settle timers are mutually exclusive, so they share one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Retrying { due: Instant },
    Settling { due: Instant },
    Connected,
}

/// Owns the transport and keeps it open.
///
/// Failed opens and unexpected closes are logged and retried at a fixed
/// interval, forever, with at most one retry pending. A successful open is
/// followed by a settle delay before the link counts as usable. Writes are
/// best effort: while disconnected they are dropped.
///
/// The manager never sleeps. Callers pass the current time in and call
/// [`poll`](Self::poll) when [`next_deadline`](Self::next_deadline) passes.
pub struct ConnectionManager<T> {
    transport: T,
    tx: Sender<Inbound>,
    phase: Phase,
    session: u64,
    retry_interval: Duration,
    settle_delay: Duration,
    attempts: u64,
    dropped_writes: u64,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a disconnected manager. Inbound events of every session are
    /// delivered to `tx`.
    pub fn new(transport: T, tx: Sender<Inbound>, config: &LinkConfig) -> Self {
        Self {
            transport,
            tx,
            phase: Phase::Disconnected,
            session: 0,
            retry_interval: config.retry_interval,
            settle_delay: config.settle_delay,
            attempts: 0,
            dropped_writes: 0,
        }
    }

    /// Open the transport, closing it first if it is open.
    ///
    /// On success any pending retry is cancelled and the settle delay starts.
    /// On failure a retry is scheduled unless one is already pending.
    pub fn connect(&mut self, now: Instant) -> ConnectionEvent {
        if self.is_connected() {
            debug!(port = self.transport.name(), "reconnecting, closing current session");
            self.disconnect();
        }

        self.attempts += 1;
        self.session += 1;
        let sink = LineSink::new(self.session, self.tx.clone());

        match self.transport.open(sink) {
            Ok(()) => {
                let due = now + self.settle_delay;
                self.phase = Phase::Settling { due };
                info!(
                    port = self.transport.name(),
                    session = self.session,
                    attempt = self.attempts,
                    "transport opened, waiting for board to settle"
                );
                ConnectionEvent::Opened {
                    session: self.session,
                }
            }
            Err(err) => {
                let due = match self.phase {
                    Phase::Retrying { due } => due,
                    _ => {
                        let due = now + self.retry_interval;
                        self.phase = Phase::Retrying { due };
                        due
                    }
                };
                warn!(
                    port = self.transport.name(),
                    attempt = self.attempts,
                    error = %err,
                    retry_in = ?due.saturating_duration_since(now),
                    "failed to open transport"
                );
                ConnectionEvent::RetryScheduled { due }
            }
        }
    }

    /// Close the transport and cancel any pending retry. Idempotent.
    pub fn disconnect(&mut self) {
        if self.phase != Phase::Disconnected {
            debug!(port = self.transport.name(), session = self.session, "disconnecting");
        }
        self.transport.close();
        self.phase = Phase::Disconnected;
    }

    /// Whether the transport is open, settled or not.
    pub fn is_connected(&self) -> bool {
        matches!(self.phase, Phase::Settling { .. } | Phase::Connected)
    }

    /// Whether the settle delay after the last open has elapsed.
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Connected
    }

    pub fn retry_pending(&self) -> bool {
        matches!(self.phase, Phase::Retrying { .. })
    }

    /// Best-effort write. Dropped while disconnected; failures are logged.
    pub fn write(&mut self, bytes: &[u8]) {
        if !self.is_connected() {
            self.dropped_writes += 1;
            debug!(len = bytes.len(), "not connected, dropping write");
            return;
        }
        if let Err(err) = self.transport.write(bytes) {
            self.dropped_writes += 1;
            warn!(port = self.transport.name(), error = %err, "write failed");
        }
    }

    /// Route one inbound event. Events from an older session, or arriving
    /// while disconnected, are dropped.
    pub fn handle_inbound(&mut self, inbound: Inbound, now: Instant) -> Incoming {
        if inbound.session != self.session || !self.is_connected() {
            trace!(
                session = inbound.session,
                current = self.session,
                "ignoring event from inactive session"
            );
            return Incoming::Ignored;
        }

        match inbound.event {
            TransportEvent::Line(line) => Incoming::Line(line),
            TransportEvent::Closed => {
                self.transport.close();
                let due = now + self.retry_interval;
                self.phase = Phase::Retrying { due };
                warn!(
                    port = self.transport.name(),
                    session = self.session,
                    retry_in = ?self.retry_interval,
                    "transport closed unexpectedly"
                );
                Incoming::Lost
            }
        }
    }

    /// Fire whichever timer is due.
    pub fn poll(&mut self, now: Instant) -> Option<ConnectionEvent> {
        match self.phase {
            Phase::Retrying { due } if now >= due => {
                self.phase = Phase::Disconnected;
                Some(self.connect(now))
            }
            Phase::Settling { due } if now >= due => {
                self.phase = Phase::Connected;
                info!(port = self.transport.name(), session = self.session, "link settled");
                Some(ConnectionEvent::Settled)
            }
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Retrying { due } | Phase::Settling { due } => Some(due),
            Phase::Disconnected | Phase::Connected => None,
        }
    }

    /// Open attempts made so far, successful or not.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Writes discarded because the link was down or the write failed.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes
    }

    /// Session number of the most recent open attempt.
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::mpsc::{self, Receiver};

    use pilotlink_transport::{Result as TransportResult, TransportError};

    use super::*;

    /// Fails the first `failures` opens, then succeeds.
    #[derive(Default)]
    struct FlakyTransport {
        failures: usize,
        open: bool,
        opens: usize,
        closes: usize,
        written: Vec<Vec<u8>>,
        write_errors: VecDeque<io::ErrorKind>,
    }

    impl Transport for FlakyTransport {
        fn open(&mut self, _sink: LineSink) -> TransportResult<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(TransportError::Open {
                    port: "/dev/ttyTEST".to_string(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            self.open = true;
            self.opens += 1;
            Ok(())
        }

        fn close(&mut self) {
            if self.open {
                self.closes += 1;
            }
            self.open = false;
        }

        fn write(&mut self, bytes: &[u8]) -> TransportResult<()> {
            if let Some(kind) = self.write_errors.pop_front() {
                return Err(io::Error::from(kind).into());
            }
            self.written.push(bytes.to_vec());
            Ok(())
        }

        fn name(&self) -> &str {
            "/dev/ttyTEST"
        }
    }

    fn manager(failures: usize) -> (ConnectionManager<FlakyTransport>, Receiver<Inbound>) {
        let (tx, rx) = mpsc::channel();
        let transport = FlakyTransport {
            failures,
            ..FlakyTransport::default()
        };
        (ConnectionManager::new(transport, tx, &LinkConfig::default()), rx)
    }

    const RETRY: Duration = Duration::from_millis(2000);
    const SETTLE: Duration = Duration::from_millis(2000);

    #[test]
    fn converges_after_failures_with_one_retry_pending() {
        let (mut mgr, _rx) = manager(3);
        let t0 = Instant::now();

        assert_eq!(mgr.connect(t0), ConnectionEvent::RetryScheduled { due: t0 + RETRY });
        assert!(mgr.retry_pending());

        // an explicit connect while a retry is pending keeps the single timer
        let early = t0 + Duration::from_millis(500);
        assert_eq!(mgr.connect(early), ConnectionEvent::RetryScheduled { due: t0 + RETRY });
        assert_eq!(mgr.next_deadline(), Some(t0 + RETRY));

        assert_eq!(mgr.poll(t0 + RETRY - Duration::from_millis(1)), None);

        let t1 = t0 + RETRY;
        assert_eq!(mgr.poll(t1), Some(ConnectionEvent::RetryScheduled { due: t1 + RETRY }));
        let t2 = t1 + RETRY;
        assert_eq!(mgr.poll(t2), Some(ConnectionEvent::Opened { session: 4 }));

        assert_eq!(mgr.attempts(), 4);
        assert!(mgr.is_connected());
        assert!(!mgr.retry_pending());
        assert_eq!(mgr.transport().opens, 1);
    }

    #[test]
    fn settles_after_delay() {
        let (mut mgr, _rx) = manager(0);
        let t0 = Instant::now();

        assert_eq!(mgr.connect(t0), ConnectionEvent::Opened { session: 1 });
        assert!(mgr.is_connected());
        assert!(!mgr.is_settled());
        assert_eq!(mgr.next_deadline(), Some(t0 + SETTLE));

        assert_eq!(mgr.poll(t0 + Duration::from_millis(1999)), None);
        assert_eq!(mgr.poll(t0 + SETTLE), Some(ConnectionEvent::Settled));
        assert!(mgr.is_settled());
        assert_eq!(mgr.next_deadline(), None);
        assert_eq!(mgr.poll(t0 + SETTLE * 2), None);
    }

    #[test]
    fn connect_while_connected_reopens() {
        let (mut mgr, _rx) = manager(0);
        let t0 = Instant::now();
        mgr.connect(t0);
        assert_eq!(mgr.connect(t0), ConnectionEvent::Opened { session: 2 });

        assert_eq!(mgr.transport().opens, 2);
        assert_eq!(mgr.transport().closes, 1);
    }

    #[test]
    fn disconnect_cancels_retry_and_is_idempotent() {
        let (mut mgr, _rx) = manager(1);
        let t0 = Instant::now();
        mgr.connect(t0);
        assert!(mgr.retry_pending());

        mgr.disconnect();
        mgr.disconnect();
        assert!(!mgr.retry_pending());
        assert!(!mgr.is_connected());
        assert_eq!(mgr.poll(t0 + RETRY * 10), None);
        assert_eq!(mgr.attempts(), 1);
    }

    #[test]
    fn writes_are_dropped_while_disconnected() {
        let (mut mgr, _rx) = manager(0);
        mgr.write(b"{\"Cmd\":\"Init\"}\n");
        assert_eq!(mgr.dropped_writes(), 1);
        assert!(mgr.transport().written.is_empty());

        mgr.connect(Instant::now());
        mgr.write(b"{\"Cmd\":\"Init\"}\n");
        assert_eq!(mgr.transport().written, vec![b"{\"Cmd\":\"Init\"}\n".to_vec()]);
        assert_eq!(mgr.dropped_writes(), 1);
    }

    #[test]
    fn write_failures_are_swallowed() {
        let (mut mgr, _rx) = manager(0);
        mgr.connect(Instant::now());
        mgr.transport_mut()
            .write_errors
            .push_back(io::ErrorKind::BrokenPipe);

        mgr.write(b"x\n");
        mgr.write(b"y\n");
        assert_eq!(mgr.dropped_writes(), 1);
        assert_eq!(mgr.transport().written, vec![b"y\n".to_vec()]);
    }

    #[test]
    fn unexpected_close_schedules_retry() {
        let (mut mgr, _rx) = manager(0);
        let t0 = Instant::now();
        mgr.connect(t0);

        let lost_at = t0 + Duration::from_secs(5);
        assert_eq!(mgr.handle_inbound(Inbound::closed(1), lost_at), Incoming::Lost);
        assert!(!mgr.is_connected());
        assert_eq!(mgr.next_deadline(), Some(lost_at + RETRY));
        assert_eq!(mgr.transport().closes, 1);

        assert_eq!(
            mgr.poll(lost_at + RETRY),
            Some(ConnectionEvent::Opened { session: 2 })
        );
    }

    #[test]
    fn stale_sessions_are_ignored() {
        let (mut mgr, _rx) = manager(0);
        let now = Instant::now();

        assert_eq!(mgr.handle_inbound(Inbound::line(0, "early"), now), Incoming::Ignored);

        mgr.connect(now);
        mgr.connect(now);
        assert_eq!(mgr.handle_inbound(Inbound::line(1, "old"), now), Incoming::Ignored);
        assert_eq!(mgr.handle_inbound(Inbound::closed(1), now), Incoming::Ignored);
        assert!(mgr.is_connected());

        assert_eq!(
            mgr.handle_inbound(Inbound::line(2, "{\"T\":\"Log\"}"), now),
            Incoming::Line("{\"T\":\"Log\"}".to_string())
        );

        mgr.disconnect();
        assert_eq!(mgr.handle_inbound(Inbound::line(2, "late"), now), Incoming::Ignored);
    }
}
