use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle of a notify transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// No client attached, no file open
    Idle,
    /// Client connected, waiting out the settle delay
    AwaitingClient,
    /// Sending chunks
    Streaming,
    /// End marker sent, file closed
    Completed,
    /// Client dropped mid-stream, no end marker sent
    Aborted,
}

/// Per-connection transfer state
///
/// Created on a connect edge and discarded on disconnect or completion. The
/// cursor itself lives in the streamer; this tracks what has been sent.
#[derive(Debug, Clone)]
pub struct TransferSession {
    id: Uuid,
    state: TransferState,
    bytes_sent: u64,
    chunks_sent: u64,
    connected_at: Instant,
    streaming_since: Option<Instant>,
    finished_at: Option<Instant>,
    started_at: DateTime<Utc>,
}

impl TransferSession {
    pub fn new(now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: TransferState::AwaitingClient,
            bytes_sent: 0,
            chunks_sent: 0,
            connected_at: now,
            streaming_since: None,
            finished_at: None,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    /// Whether the post-connect settle delay has elapsed
    pub fn is_settled(&self, now: Instant, settle: Duration) -> bool {
        now.saturating_duration_since(self.connected_at) >= settle
    }

    pub(crate) fn begin_streaming(&mut self, now: Instant) {
        self.state = TransferState::Streaming;
        self.streaming_since = Some(now);
        self.bytes_sent = 0;
        self.chunks_sent = 0;
    }

    pub(crate) fn record_chunk(&mut self, len: usize) {
        self.bytes_sent += len as u64;
        self.chunks_sent += 1;
    }

    pub(crate) fn complete(&mut self, now: Instant) {
        self.state = TransferState::Completed;
        self.finished_at = Some(now);
    }

    pub(crate) fn abort(&mut self, now: Instant) {
        self.state = TransferState::Aborted;
        self.finished_at = Some(now);
    }

    pub fn stats(&self, now: Instant) -> TransferStats {
        let end = self.finished_at.unwrap_or(now);
        let elapsed = self
            .streaming_since
            .map(|start| end.saturating_duration_since(start))
            .unwrap_or_default();
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput_kib_per_sec = if elapsed_secs > 0.0 {
            self.bytes_sent as f64 / elapsed_secs / 1024.0
        } else {
            0.0
        };

        TransferStats {
            session_id: self.id.to_string(),
            state: self.state,
            started_at: self.started_at,
            bytes_sent: self.bytes_sent,
            chunks_sent: self.chunks_sent,
            elapsed_secs,
            throughput_kib_per_sec,
        }
    }
}

/// Statistics reported when a session ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStats {
    pub session_id: String,

    pub state: TransferState,

    /// Wall-clock time of the connect edge
    pub started_at: DateTime<Utc>,

    /// File bytes sent (end marker excluded)
    pub bytes_sent: u64,

    /// Data chunks sent (end marker excluded)
    pub chunks_sent: u64,

    /// Seconds from the first chunk to completion or abort
    pub elapsed_secs: f64,

    pub throughput_kib_per_sec: f64,
}
