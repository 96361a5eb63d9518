//! Error taxonomy shared by the recorder and transfer pipelines.
//!
//! Every error is handled where it originates: the owning state machine moves
//! to a terminal or reset state and callers observe the outcome through
//! `Result` values, never through panics.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Backing store failures. Fatal to the current session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to mount storage at {path}")]
    Mount {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to create {path}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {path}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path} not found")]
    NotFound { path: String },

    #[error("failed to write {path}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to seek in {path}")]
    Seek {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to list storage")]
    List {
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {path}")]
    Remove {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path} would exceed the 32-bit WAV data size limit")]
    TooLarge { path: String },

    #[error("no file is open for streaming")]
    NotOpen,
}

/// Audio source failures. Fatal to the recording.
#[derive(Debug, Error)]
pub enum PeripheralError {
    #[error("audio read failed with code {code}")]
    Read { code: i32 },

    #[error("audio read timed out after {0:?}")]
    Timeout(Duration),

    #[error("audio source returned no data")]
    NoData,

    #[error("audio source I/O failed")]
    Io(#[from] io::Error),

    #[error("failed to decode audio source: {0}")]
    Decode(String),
}

/// Link failures. Recoverable: the session resets and waits for a reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer disconnected")]
    Disconnected,

    #[error("transport channel closed")]
    Closed,

    #[error("failed to send message: {0}")]
    Send(String),
}

/// Bounded waits that expired. Recoverable, they drive the halt path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolTimeout {
    #[error("no client connected within {waited:?}")]
    NoClient { waited: Duration },

    #[error("transfer did not complete within {elapsed:?}")]
    Transfer { elapsed: Duration },

    #[error("no download confirmation within {waited:?}")]
    NoConfirmation { waited: Duration },
}

/// Invalid stream parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("unsupported bit depth {0}, expected 16 or 32")]
    BitDepth(u16),

    #[error("channel count must be at least 1")]
    NoChannels,

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("{channels} channels of {bits_per_sample}-bit samples overflow the 16-bit block align field")]
    BlockAlignOverflow { channels: u16, bits_per_sample: u16 },

    #[error("{sample_rate_hz} Hz at {block_align} bytes per frame overflows the 32-bit byte rate field")]
    ByteRateOverflow { sample_rate_hz: u32, block_align: u16 },

    #[error("32-to-16-bit conversion needs a 32-bit source, got {0} bits")]
    ConversionSource(u16),
}

/// WAV header parse failures.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("header needs 44 bytes, got {0}")]
    Truncated(usize),

    #[error("header is an unfinalized placeholder")]
    Placeholder,

    #[error("missing {0:?} literal")]
    Magic(&'static str),

    #[error("unsupported audio format {0}, expected PCM (1)")]
    Format(u16),

    #[error("file size field {file_size} does not match data size {data_size} + 36")]
    SizeMismatch { file_size: u32, data_size: u32 },

    #[error("failed to read header")]
    Io(#[from] io::Error),
}

/// Reasons a recording session ends without a usable file.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Peripheral(#[from] PeripheralError),

    #[error(transparent)]
    Spec(#[from] SpecError),
}

impl RecordError {
    /// Whether the failed session may have left a partial file behind.
    /// Spec errors and failed creates happen before the file is opened.
    pub fn left_partial_file(&self) -> bool {
        match self {
            Self::Spec(_) => false,
            Self::Storage(StorageError::Create { .. }) => false,
            Self::Storage(_) | Self::Peripheral(_) => true,
        }
    }
}

/// Fatal streamer failures (transport problems are handled by the link).
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode chunk message")]
    Encode(#[from] serde_json::Error),
}

/// Receiver-side decode failures.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed chunk message")]
    Json(#[from] serde_json::Error),

    #[error("chunk payload is not valid base64")]
    Base64(#[from] base64::DecodeError),
}
