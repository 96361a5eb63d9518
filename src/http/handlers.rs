use super::state::AppState;
use crate::error::StorageError;
use crate::halt::HaltReason;
use crate::storage::{OpenMode, StorageFile};
use crate::transfer::FileChunks;
use crate::wav::WavHeader;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::io;
use tracing::{error, info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RecordingStatus {
    pub file: String,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub data_size: u32,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
/// Landing page with a download link
pub async fn index() -> impl IntoResponse {
    Html("<h1>ESP32 WAV Recorder</h1><a href='/download'>Download Recorded WAV</a>")
}

/// GET /download
/// Stream the recording as a chunked `audio/wav` body
///
/// A missing or unreadable recording ends the serving phase with a storage
/// failure halt.
pub async fn download(State(state): State<AppState>) -> Response {
    let path = match state.current_recording() {
        Ok(Some(path)) if state.storage.exists(&path) => path,
        Ok(_) => {
            error!("File not found");
            state.gate.halt(HaltReason::StorageFailure);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
        Err(e) => {
            error!("Failed to look up recording: {}", e);
            state.gate.halt(HaltReason::StorageFailure);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to open file").into_response();
        }
    };

    let file = match state.storage.open(&path, OpenMode::Read) {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open file: {}", e);
            state.gate.halt(HaltReason::StorageFailure);
            let status = match e {
                StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return (status, "Failed to open file").into_response();
        }
    };

    info!(
        "Serving {} in chunks of up to {} bytes",
        path, state.transfer_chunk_size
    );

    let chunks = FileChunks::new(file, state.transfer_chunk_size);
    let body = Body::from_stream(blocking_chunks(chunks));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CONNECTION, "close"),
        ],
        body,
    )
        .into_response()
}

/// Pull each chunk on the blocking pool so storage reads never stall a
/// runtime worker
fn blocking_chunks(
    chunks: FileChunks<Box<dyn StorageFile>>,
) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
    stream::unfold(Some(chunks), |chunks| async move {
        let mut chunks = chunks?;
        let read = tokio::task::spawn_blocking(move || {
            let next = chunks.next();
            (chunks, next)
        })
        .await;

        match read {
            Ok((chunks, Some(item))) => Some((item, Some(chunks))),
            Ok((_, None)) => None,
            Err(e) => Some((Err(io::Error::new(io::ErrorKind::Other, e)), None)),
        }
    })
}

/// GET /confirm
/// Client finished downloading; let the device shut down
pub async fn confirm(State(state): State<AppState>) -> impl IntoResponse {
    info!("Received confirmation from client. Stopping server...");
    if !state.gate.confirm() {
        warn!("Shutdown already pending ({:?})", state.gate.reason());
    }
    (StatusCode::OK, "Server shutting down")
}

/// GET /status
/// Header fields of the recording that `/download` would serve
pub async fn recording_status(State(state): State<AppState>) -> Response {
    let path = match state.current_recording() {
        Ok(Some(path)) => path,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "No recording available".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to list recordings: {}", e),
                }),
            )
                .into_response()
        }
    };

    let header = state
        .storage
        .open(&path, OpenMode::Read)
        .map_err(|e| e.to_string())
        .and_then(|mut file| WavHeader::read_from(&mut file).map_err(|e| e.to_string()));

    match header {
        Ok(header) => (
            StatusCode::OK,
            Json(RecordingStatus {
                file: path,
                sample_rate: header.sample_rate,
                bits_per_sample: header.bits_per_sample,
                channels: header.channels,
                data_size: header.data_size,
                duration_secs: header.duration_secs(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to read header of {}: {}", path, e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: format!("Recording {} is not a finalized WAV file: {}", path, e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
