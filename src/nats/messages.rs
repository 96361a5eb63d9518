use serde::{Deserialize, Serialize};

/// Payload published on the link subject by a connecting client
pub const CONNECT_PAYLOAD: &[u8] = b"connect";
/// Payload published on the link subject by a departing client
pub const DISCONNECT_PAYLOAD: &[u8] = b"disconnect";

/// Discovery announcement published on the advertise subject
#[derive(Debug, Serialize, Deserialize)]
pub struct Advertisement {
    pub device: String,
    /// Subject carrying the file chunks
    pub data_subject: String,
    /// Subject the client publishes connect/disconnect on
    pub link_subject: String,
    pub timestamp: String, // RFC3339 timestamp
}
