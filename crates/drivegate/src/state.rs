// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::DriveConfig;
use crate::credential::flow::OAuthFlow;
use crate::credential::lifecycle::TokenLifecycle;
use crate::credential::store::CredentialStore;
use crate::drive::facade::DriveFacade;

/// Shared server state. Every component is wired here once at startup.
pub struct AppState {
    pub config: DriveConfig,
    pub store: Arc<CredentialStore>,
    pub tokens: Arc<TokenLifecycle>,
    pub flow: OAuthFlow,
    pub drive: DriveFacade,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: DriveConfig,
        store: Arc<CredentialStore>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let http = build_http_client(config.http_timeout())?;
        let endpoints = config.endpoints();

        let tokens = Arc::new(TokenLifecycle::new(
            Arc::clone(&store),
            http.clone(),
            endpoints.token_url.clone(),
        ));
        let flow = OAuthFlow::new(
            Arc::clone(&store),
            http.clone(),
            endpoints.clone(),
            config.redirect_uri(),
        );
        let drive = DriveFacade::new(Arc::clone(&tokens), http, endpoints);

        Ok(Self { config, store, tokens, flow, drive, shutdown })
    }
}

/// Build the one HTTP client used for every provider call.
///
/// Installs the ring TLS provider first; reqwest is built without one.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(client)
}
