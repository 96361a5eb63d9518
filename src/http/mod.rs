//! HTTP download server (WiFi access point variant)
//!
//! - GET / - Landing page
//! - GET /download - Recording as a chunked `audio/wav` body
//! - GET /confirm - Client confirms the download, server may shut down
//! - GET /status - Header fields of the served recording
//! - GET /health - Health check

mod confirm;
mod handlers;
mod routes;
mod state;

pub use confirm::ConfirmationGate;
pub use handlers::{ErrorResponse, RecordingStatus};
pub use routes::create_router;
pub use state::AppState;

use crate::halt::HaltReason;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Serve until the client confirms, a storage failure occurs, or
/// `confirmation_timeout` passes
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    confirmation_timeout: Duration,
) -> Result<HaltReason> {
    let gate = state.gate.clone();
    let router = create_router(state);

    info!("HTTP server started on {}", listener.local_addr()?);

    let shutdown_gate = gate.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let reason = shutdown_gate.wait(confirmation_timeout).await;
            info!("Shutting down server ({})", reason);
        })
        .await
        .context("HTTP server failed")?;

    Ok(gate.reason().unwrap_or(HaltReason::ConfirmationTimeout))
}
