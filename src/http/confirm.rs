use crate::error::ProtocolTimeout;
use crate::halt::HaltReason;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// One-shot latch deciding when the download server may stop
///
/// The first reason recorded wins; later calls are ignored.
#[derive(Clone)]
pub struct ConfirmationGate {
    tx: Arc<watch::Sender<Option<HaltReason>>>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Client confirmed the download
    pub fn confirm(&self) -> bool {
        self.halt(HaltReason::Confirmed)
    }

    /// Record `reason`; returns false if a reason was already set
    pub fn halt(&self, reason: HaltReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn reason(&self) -> Option<HaltReason> {
        *self.tx.borrow()
    }

    /// Wait for a reason, treating `timeout` without one as implicit confirmation
    pub async fn wait(&self, timeout: Duration) -> HaltReason {
        let mut rx = self.tx.subscribe();

        let reason = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(current)) => *current,
            Ok(Err(_)) | Err(_) => None,
        };

        match reason {
            Some(reason) => reason,
            None => {
                warn!("{}", ProtocolTimeout::NoConfirmation { waited: timeout });
                self.halt(HaltReason::ConfirmationTimeout);
                self.reason().unwrap_or(HaltReason::ConfirmationTimeout)
            }
        }
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}
