// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drivegate: single-account Google Drive proxy with OAuth token lifecycle.

pub mod config;
pub mod credential;
pub mod drive;
pub mod error;
pub mod state;
pub mod test_support;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DriveConfig;
use crate::credential::store::CredentialStore;
use crate::state::AppState;
use crate::transport::build_router;

/// Run the drive proxy until shutdown.
pub async fn run(config: DriveConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state_dir = config.state_dir();
    let store = Arc::new(CredentialStore::open(&state_dir));
    let state = Arc::new(AppState::new(config, store, CancellationToken::new())?);

    {
        let shutdown = state.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    let status = state.tokens.status().await;
    info!(
        state_dir = %state_dir.display(),
        redirect_uri = %state.flow.redirect_uri(),
        has_credentials = status.has_credentials,
        authenticated = status.auth_status,
        "drivegate listening on {addr}"
    );
    if state.config.auth_token.is_none() {
        tracing::warn!("no --auth-token set: admin endpoints are unauthenticated");
    }

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, state).await
}

/// Serve the router on `listener` until `state.shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    info!("drivegate stopped");
    Ok(())
}
