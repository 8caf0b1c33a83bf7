// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token lifecycle: decides whether the stored access token is usable and
//! refreshes it on demand.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credential::oauth::request_token;
use crate::credential::store::CredentialStore;
use crate::credential::{epoch_secs, TokenSet};

/// Owns the usable-token decision for the single account.
pub struct TokenLifecycle {
    store: Arc<CredentialStore>,
    http: reqwest::Client,
    token_url: String,
    /// Single-flight guard around the refresh branch.
    refresh_guard: Mutex<()>,
}

/// Snapshot of the connection state (no network involved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub has_credentials: bool,
    /// A token exists and is either unexpired or refreshable.
    pub auth_status: bool,
    pub has_refresh_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
}

impl TokenLifecycle {
    pub fn new(store: Arc<CredentialStore>, http: reqwest::Client, token_url: String) -> Self {
        Self { store, http, token_url, refresh_guard: Mutex::new(()) }
    }

    /// Make sure a usable access token is stored, refreshing once if needed.
    ///
    /// Returns false when no client is configured, no token is stored, the
    /// token is expired without a refresh token, or the refresh fails. A
    /// failed refresh leaves the stored token untouched.
    pub async fn ensure_usable_token(&self) -> bool {
        if !self.store.get_credentials().await.is_configured() {
            return false;
        }
        let Some(token) = self.store.get_token_set().await else {
            return false;
        };
        if !token.is_expired_at(epoch_secs()) {
            return true;
        }
        if !token.has_refresh_token() {
            debug!("access token expired and no refresh token stored");
            return false;
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited.
        let Some(token) = self.store.get_token_set().await else {
            return false;
        };
        if !token.is_expired_at(epoch_secs()) {
            return true;
        }
        self.refresh(token).await
    }

    /// The current access token, after [`ensure_usable_token`](Self::ensure_usable_token).
    pub async fn usable_access_token(&self) -> Option<String> {
        if !self.ensure_usable_token().await {
            return None;
        }
        self.store.get_token_set().await.map(|t| t.access_token)
    }

    pub async fn status(&self) -> AuthStatus {
        let has_credentials = self.store.get_credentials().await.is_configured();
        let token = self.store.get_token_set().await;
        let now = epoch_secs();
        match token {
            Some(t) => {
                let expired = t.is_expired_at(now);
                AuthStatus {
                    has_credentials,
                    auth_status: !expired || t.has_refresh_token(),
                    has_refresh_token: t.has_refresh_token(),
                    expires_in_secs: if expired { None } else { Some(t.expires_at - now) },
                }
            }
            None => AuthStatus {
                has_credentials,
                auth_status: false,
                has_refresh_token: false,
                expires_in_secs: None,
            },
        }
    }

    async fn refresh(&self, current: TokenSet) -> bool {
        let Some(refresh_token) = current.refresh_token.clone() else {
            return false;
        };
        let creds = self.store.get_credentials().await;

        let result = request_token(
            &self.http,
            &self.token_url,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", &creds.client_id),
                ("client_secret", &creds.client_secret),
                ("refresh_token", &refresh_token),
            ],
        )
        .await;

        match result {
            Ok(resp) => {
                // Refresh tokens are not always reissued.
                let refresh_token =
                    resp.refresh_token.filter(|rt| !rt.is_empty()).or(Some(refresh_token));
                let token = TokenSet::issued_now(resp.access_token, refresh_token, resp.expires_in);
                let expires_at = token.expires_at;
                self.store.save_token_set(token).await;
                info!(expires_at, "access token refreshed");
                true
            }
            Err(e) => {
                warn!(err = %e, "access token refresh failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
