use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Why the device leaves the active phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// Client called the confirmation endpoint
    Confirmed,
    /// No confirmation arrived in time (treated as implicit confirmation)
    ConfirmationTimeout,
    /// Notify transfer finished with the end marker
    TransferComplete,
    /// Notify transfer hit its session timeout
    TransferTimeout,
    /// Transport event source went away
    LinkClosed,
    StorageFailure,
    PeripheralFailure,
}

impl HaltReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::StorageFailure | Self::PeripheralFailure)
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Confirmed => "download confirmed",
            Self::ConfirmationTimeout => "confirmation timeout",
            Self::TransferComplete => "transfer complete",
            Self::TransferTimeout => "transfer timeout",
            Self::LinkClosed => "link closed",
            Self::StorageFailure => "storage failure",
            Self::PeripheralFailure => "audio peripheral failure",
        };
        f.write_str(text)
    }
}

/// Final log line before the process hands over to the power controller
pub fn enter_low_power(reason: HaltReason) {
    if reason.is_failure() {
        warn!("Entering low-power halt: {}", reason);
    } else {
        info!("Entering low-power halt: {}", reason);
    }
}
