use super::monitor::{ConnectionMonitor, LinkEdge};
use super::session::{TransferSession, TransferState, TransferStats};
use super::streamer::ChunkStreamer;
use crate::error::{ProtocolTimeout, TransferError, TransportError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Connection callbacks from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
}

/// Fire-and-forget message channel to a single connected peer
#[async_trait::async_trait]
pub trait Notifier: Send {
    /// Push one bounded message. Delivery is not acknowledged.
    async fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Make the device discoverable again
    async fn advertise(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// Notifier that forwards every message into an mpsc channel
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    advertisements: u32,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                advertisements: 0,
            },
            rx,
        )
    }

    pub fn advertisements(&self) -> u32 {
        self.advertisements
    }
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    async fn advertise(&mut self) -> Result<(), TransportError> {
        self.advertisements += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Timing policy for the notify loop
#[derive(Debug, Clone, Copy)]
pub struct LinkTiming {
    /// Quiet period after a connect edge before the first chunk
    pub settle_delay: Duration,
    /// Minimum interval between two sends
    pub pacing: Duration,
    /// Tick interval while no chunk is due
    pub poll_interval: Duration,
    /// Ceiling on the whole transfer activity, measured from `run`
    pub session_timeout: Option<Duration>,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(5),
            pacing: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
            session_timeout: None,
        }
    }
}

/// How a notify transfer ended
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// End marker sent
    Completed(TransferStats),
    /// The session timeout expired first
    TimedOut(ProtocolTimeout),
    /// The transport's event channel closed
    LinkClosed,
}

/// Single-client notify transfer loop
///
/// One cooperative loop drains connection events, checks the timeout and
/// sends at most one message per tick. A reconnect always restarts the file
/// from offset 0.
pub struct NotifyLink<N> {
    notifier: N,
    streamer: ChunkStreamer,
    timing: LinkTiming,
    monitor: ConnectionMonitor,
    session: Option<TransferSession>,
}

impl<N: Notifier> NotifyLink<N> {
    pub fn new(notifier: N, streamer: ChunkStreamer, timing: LinkTiming) -> Self {
        Self {
            notifier,
            streamer,
            timing,
            monitor: ConnectionMonitor::new(),
            session: None,
        }
    }

    /// Current session state (`Idle` without a client)
    pub fn state(&self) -> TransferState {
        self.session
            .as_ref()
            .map(TransferSession::state)
            .unwrap_or(TransferState::Idle)
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_notifier(self) -> N {
        self.notifier
    }

    /// Drive the transfer until completion, timeout or link shutdown
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<LinkEvent>,
    ) -> Result<TransferOutcome, TransferError> {
        let began = Instant::now();

        info!(
            "Waiting for a client connection on {} to start transfer of {}",
            self.notifier.name(),
            self.streamer.path()
        );

        loop {
            loop {
                match events.try_recv() {
                    Ok(event) => self.handle_event(event).await,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("Link event channel closed");
                        self.abort_session(Instant::now());
                        return Ok(TransferOutcome::LinkClosed);
                    }
                }
            }

            let now = Instant::now();
            if let Some(limit) = self.timing.session_timeout {
                let elapsed = now.saturating_duration_since(began);
                if elapsed >= limit {
                    let timeout = if self.monitor.connects() == 0 {
                        ProtocolTimeout::NoClient { waited: elapsed }
                    } else {
                        ProtocolTimeout::Transfer { elapsed }
                    };
                    warn!("{}", timeout);
                    self.abort_session(now);
                    return Ok(TransferOutcome::TimedOut(timeout));
                }
            }

            let wait = match self.state() {
                TransferState::AwaitingClient => {
                    if let Some(session) = self.session.as_mut() {
                        if session.is_settled(now, self.timing.settle_delay) {
                            self.streamer.begin(session, now)?;
                            info!("Starting transfer...");
                            Duration::ZERO
                        } else {
                            self.timing.poll_interval
                        }
                    } else {
                        self.timing.poll_interval
                    }
                }
                TransferState::Streaming => {
                    if let Some(stats) = self.send_next(now).await? {
                        info!(
                            "File transfer complete! {} bytes in {} chunks, {:.2} kB/sec",
                            stats.bytes_sent, stats.chunks_sent, stats.throughput_kib_per_sec
                        );
                        return Ok(TransferOutcome::Completed(stats));
                    }
                    self.timing.pacing
                }
                _ => self.timing.poll_interval,
            };

            if wait.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(wait).await;
            }
        }
    }

    async fn handle_event(&mut self, event: LinkEvent) {
        let connected = event == LinkEvent::Connected;
        match self.monitor.observe(connected) {
            Some(LinkEdge::Connected) => {
                let session = TransferSession::new(Instant::now());
                info!("Client connected (session {})", session.id());
                self.session = Some(session);
            }
            Some(LinkEdge::Disconnected) => {
                self.abort_session(Instant::now());
                self.session = None;
                match self.notifier.advertise().await {
                    Ok(()) => info!("Advertising restarted..."),
                    Err(e) => error!("Failed to restart advertising: {}", e),
                }
            }
            None => debug!("Ignoring repeated {:?} event", event),
        }
    }

    /// Send one message; returns stats once the end marker went out
    async fn send_next(&mut self, now: Instant) -> Result<Option<TransferStats>, TransferError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        let outgoing = self.streamer.next(session, now)?;
        if let Err(e) = self.notifier.notify(outgoing.payload()).await {
            warn!("Failed to notify chunk: {}", e);
        }

        if outgoing.is_end() {
            let stats = session.stats(now);
            self.session = None;
            return Ok(Some(stats));
        }

        Ok(None)
    }

    fn abort_session(&mut self, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            if session.state() == TransferState::Streaming {
                self.streamer.abort(session, now);
                let stats = session.stats(now);
                warn!(
                    "Transfer aborted after {} bytes ({} chunks); restarting from the beginning on reconnect",
                    stats.bytes_sent, stats.chunks_sent
                );
            }
        }
    }
}
