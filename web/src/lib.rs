//! HTTP edge of the fan-out service: the SSE subscribe stream, the producer
//! endpoint that appends to the messages log, and membership endpoints.

use log::*;
use tokio::net::TcpListener;

pub use self::error::{Error, Result};
pub use service::AppState;

mod controller;
pub mod error;
mod params;
pub mod router;
mod sse;

/// Serve the API on the configured interface and port until the state's
/// shutdown token is cancelled. Cancelling also ends every live SSE stream.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", interface, app_state.config.port);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server starting... listening for connections on http://{addr}");

    let shutdown = app_state.shutdown.clone();

    axum::serve(listener, router::define_routes(app_state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
