use super::chunks::ChunkProducer;
use super::framing::{ChunkMessage, Framing, END_OF_FILE_MARKER};
use super::session::TransferSession;
use crate::error::{StorageError, TransferError};
use crate::storage::{OpenMode, Storage, StorageFile};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Streamer settings
#[derive(Debug, Clone, Copy)]
pub struct StreamerConfig {
    /// Maximum file bytes per data message
    pub chunk_size: usize,
    pub framing: Framing,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            framing: Framing::Raw,
        }
    }
}

/// Next message to put on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outgoing<'a> {
    /// Framed file data
    Data(&'a [u8]),
    /// Framed end-of-stream marker
    End(&'a [u8]),
}

impl<'a> Outgoing<'a> {
    pub fn payload(&self) -> &'a [u8] {
        match self {
            Outgoing::Data(p) | Outgoing::End(p) => p,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Outgoing::End(_))
    }
}

/// Reads a finalized recording back in chunks for a notify link
///
/// The chunk and frame buffers are reused across sends; only one message is
/// in flight at a time.
pub struct ChunkStreamer {
    storage: Arc<dyn Storage>,
    path: String,
    config: StreamerConfig,
    producer: Option<ChunkProducer<Box<dyn StorageFile>>>,
    chunk: Vec<u8>,
    frame: Vec<u8>,
}

impl ChunkStreamer {
    pub fn new(storage: Arc<dyn Storage>, path: impl Into<String>, config: StreamerConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        if config.framing == Framing::Raw && chunk_size <= END_OF_FILE_MARKER.len() {
            warn!(
                "Chunk size {} does not exceed the end marker length; receivers may confuse data with the marker",
                chunk_size
            );
        }

        Self {
            storage,
            path: path.into(),
            config: StreamerConfig {
                chunk_size,
                ..config
            },
            producer: None,
            chunk: vec![0u8; chunk_size],
            frame: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> StreamerConfig {
        self.config
    }

    /// Whether a file handle is currently open
    pub fn is_open(&self) -> bool {
        self.producer.is_some()
    }

    /// Open the file at offset 0 and move `session` to streaming
    pub fn begin(&mut self, session: &mut TransferSession, now: Instant) -> Result<(), StorageError> {
        let file = self.storage.open(&self.path, OpenMode::Read)?;
        self.producer = Some(ChunkProducer::new(file, self.config.chunk_size));
        session.begin_streaming(now);

        info!("Streaming {} (session {})", self.path, session.id());

        Ok(())
    }

    /// Read the next chunk, or the end marker once the file is exhausted
    pub fn next(
        &mut self,
        session: &mut TransferSession,
        now: Instant,
    ) -> Result<Outgoing<'_>, TransferError> {
        let producer = self.producer.as_mut().ok_or(StorageError::NotOpen)?;
        let offset = producer.offset();
        let n = producer
            .produce(&mut self.chunk)
            .map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })?;

        if n == 0 {
            self.producer = None;
            session.complete(now);

            let sequence = session.chunks_sent();
            return match self.config.framing {
                Framing::Raw => Ok(Outgoing::End(END_OF_FILE_MARKER)),
                Framing::Json => {
                    let msg = ChunkMessage::end(&session.id().to_string(), sequence, offset);
                    self.frame.clear();
                    serde_json::to_writer(&mut self.frame, &msg)?;
                    Ok(Outgoing::End(&self.frame))
                }
            };
        }

        let sequence = session.chunks_sent();
        session.record_chunk(n);
        debug!("Chunk {} at offset {} ({} bytes)", sequence, offset, n);

        match self.config.framing {
            Framing::Raw => {
                let data = &self.chunk[..n];
                if data == END_OF_FILE_MARKER {
                    warn!(
                        "Chunk {} is byte-identical to the end marker; raw-framed receivers will stop early",
                        sequence
                    );
                }
                Ok(Outgoing::Data(data))
            }
            Framing::Json => {
                let msg =
                    ChunkMessage::data(&session.id().to_string(), sequence, offset, &self.chunk[..n]);
                self.frame.clear();
                serde_json::to_writer(&mut self.frame, &msg)?;
                Ok(Outgoing::Data(&self.frame))
            }
        }
    }

    /// Close the file without an end marker
    pub fn abort(&mut self, session: &mut TransferSession, now: Instant) {
        self.producer = None;
        session.abort(now);
    }
}
