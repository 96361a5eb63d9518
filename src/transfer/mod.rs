//! Delivery of a finished recording to a single client
//!
//! - `chunks`: pull producer used by the HTTP body and the notify streamer
//! - `streamer`: chunk-by-chunk reader with end-of-stream framing
//! - `link`: cooperative notify loop (settle delay, pacing, reconnect reset)
//! - `monitor`: connect/disconnect edge detection
//! - `session`: per-connection state and statistics

pub mod chunks;
pub mod framing;
pub mod link;
pub mod monitor;
pub mod session;
pub mod streamer;

pub use chunks::{ChunkProducer, FileChunks};
pub use framing::{ChunkMessage, Frame, Framing, END_OF_FILE_MARKER};
pub use link::{ChannelNotifier, LinkEvent, LinkTiming, Notifier, NotifyLink, TransferOutcome};
pub use monitor::{ConnectionMonitor, LinkEdge};
pub use session::{TransferSession, TransferState, TransferStats};
pub use streamer::{ChunkStreamer, Outgoing, StreamerConfig};
