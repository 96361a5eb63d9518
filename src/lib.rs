pub mod audio;
pub mod config;
pub mod error;
pub mod halt;
pub mod http;
pub mod nats;
pub mod storage;
pub mod transfer;
pub mod wav;

pub use audio::{
    AudioSource, AudioStreamSpec, CaptureLimit, Recorder, RecorderConfig, RecordingMetadata,
    SampleConversion, ToneSource, WavFileSource,
};
pub use config::Config;
pub use error::{PeripheralError, ProtocolTimeout, RecordError, StorageError, TransferError};
pub use halt::{enter_low_power, HaltReason};
pub use http::{create_router, AppState, ConfirmationGate};
pub use nats::{NatsLink, NatsNotifier};
pub use storage::{LocalStorage, MemoryStorage, OpenMode, Storage};
pub use transfer::{ChunkStreamer, LinkEvent, Notifier, NotifyLink, TransferOutcome};
pub use wav::{WavHeader, WavWriter};
