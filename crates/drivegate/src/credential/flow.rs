// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorization-code flow: consent URL, callback handling, code exchange.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Endpoints;
use crate::credential::oauth::{request_token, url_with_query, DRIVE_SCOPES};
use crate::credential::store::CredentialStore;
use crate::credential::TokenSet;
use crate::error::DriveError;

/// Query parameters the provider appends when redirecting back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Acquires the first token set through the provider's consent screen.
pub struct OAuthFlow {
    store: Arc<CredentialStore>,
    http: reqwest::Client,
    endpoints: Endpoints,
    redirect_uri: String,
}

impl OAuthFlow {
    pub fn new(
        store: Arc<CredentialStore>,
        http: reqwest::Client,
        endpoints: Endpoints,
        redirect_uri: String,
    ) -> Self {
        Self { store, http, endpoints, redirect_uri }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Consent URL requesting offline access so a refresh token is issued.
    pub async fn build_authorization_url(&self) -> Result<String, DriveError> {
        let creds = self.store.get_credentials().await;
        if !creds.is_configured() {
            return Err(DriveError::NotConfigured);
        }
        let scope = DRIVE_SCOPES.join(" ");
        Ok(url_with_query(
            &self.endpoints.auth_url,
            &[
                ("client_id", &creds.client_id),
                ("redirect_uri", &self.redirect_uri),
                ("response_type", "code"),
                ("scope", &scope),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        ))
    }

    /// Trade an authorization code for a token set and persist it.
    ///
    /// A refresh token already on file survives when the response omits one.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, DriveError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DriveError::auth("missing authorization code"));
        }
        let creds = self.store.get_credentials().await;
        if !creds.is_configured() {
            return Err(DriveError::NotConfigured);
        }

        let resp = request_token(
            &self.http,
            &self.endpoints.token_url,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &creds.client_id),
                ("client_secret", &creds.client_secret),
                ("redirect_uri", &self.redirect_uri),
            ],
        )
        .await
        .map_err(|e| {
            warn!(err = %e, "authorization code exchange failed");
            DriveError::auth(e.reason())
        })?;

        let previous = self.store.get_token_set().await.and_then(|t| t.refresh_token);
        let refresh_token = resp.refresh_token.filter(|rt| !rt.is_empty()).or(previous);
        let token = TokenSet::issued_now(resp.access_token, refresh_token, resp.expires_in);
        self.store.save_token_set(token.clone()).await;
        info!(
            expires_at = token.expires_at,
            has_refresh_token = token.has_refresh_token(),
            "authorization code exchanged"
        );
        Ok(token)
    }

    /// The provider redirected back with an error instead of a code.
    pub fn handle_provider_error(&self, error: &str, description: Option<&str>) -> DriveError {
        let reason = description.filter(|d| !d.is_empty()).unwrap_or(error);
        warn!(error, "provider denied authorization");
        DriveError::auth(reason)
    }

    /// Complete the redirect leg: exchange the code or surface the denial.
    pub async fn handle_callback(&self, params: &CallbackParams) -> Result<TokenSet, DriveError> {
        let error = params.error.as_deref().map(str::trim).filter(|e| !e.is_empty());
        if let Some(error) = error {
            return Err(self.handle_provider_error(error, params.error_description.as_deref()));
        }
        self.exchange_code(params.code.as_deref().unwrap_or_default()).await
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
