// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `board-engine` server binary.
//!
//! Configuration comes from the environment (see [`BoardConfig::from_env`]);
//! log filtering from `RUST_LOG`.

use std::sync::Arc;

use board_engine::{http, Board, BoardConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = BoardConfig::from_env()?;
    let listen_addr = config.listen_addr.clone();

    let board = Arc::new(Board::connect(config).await?);
    let sweeper = board.spawn_sweeper();

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "Server listening");

    axum::serve(listener, http::router(Arc::clone(&board)))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C, serving until killed");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    board.shutdown().await;
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    Ok(())
}
