use crate::error::FrameError;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Literal payload that ends a raw-framed transfer
pub const END_OF_FILE_MARKER: &[u8] = b"END_OF_FILE";

/// How chunks are laid out in notify messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Chunk bytes as-is, followed by [`END_OF_FILE_MARKER`]
    #[default]
    Raw,
    /// One JSON [`ChunkMessage`] per notify, with an explicit `final` flag
    Json,
}

/// JSON-framed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMessage {
    pub session_id: String,
    pub sequence: u64,
    /// File offset of the first byte in `data`
    pub offset: u64,
    /// Base64-encoded chunk bytes (empty on the final message)
    pub data: String,
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// A notify message as seen by the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Vec<u8>),
    End,
}

impl Framing {
    /// Receiver-side decoding of one notify payload
    pub fn decode(&self, payload: &[u8]) -> Result<Frame, FrameError> {
        match self {
            Framing::Raw => {
                if payload == END_OF_FILE_MARKER {
                    Ok(Frame::End)
                } else {
                    Ok(Frame::Data(payload.to_vec()))
                }
            }
            Framing::Json => {
                let msg: ChunkMessage = serde_json::from_slice(payload)?;
                if msg.final_frame {
                    return Ok(Frame::End);
                }
                let data = base64::engine::general_purpose::STANDARD.decode(msg.data)?;
                Ok(Frame::Data(data))
            }
        }
    }
}

impl ChunkMessage {
    pub fn data(session_id: &str, sequence: u64, offset: u64, bytes: &[u8]) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            offset,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            final_frame: false,
        }
    }

    pub fn end(session_id: &str, sequence: u64, offset: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            offset,
            data: String::new(),
            final_frame: true,
        }
    }
}
