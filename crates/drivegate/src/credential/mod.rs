// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth client credentials and the single-account token record.
//!
//! The store persists both; the lifecycle manager decides whether the stored
//! access token is usable and refreshes it on demand; the flow controller
//! acquires the first token through the authorization-code grant.

pub mod flow;
pub mod lifecycle;
pub mod oauth;
pub mod store;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// OAuth client id/secret registered with the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthClientCredentials {
    /// Both fields present. Anything less blocks every remote operation.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// The active access/refresh token pair. At most one exists per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch seconds.
    pub expires_at: u64,
}

impl TokenSet {
    /// Build a token set expiring `expires_in` seconds from now.
    pub fn issued_now(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    ) -> Self {
        let lifetime = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self { access_token, refresh_token, expires_at: epoch_secs() + lifetime }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|rt| !rt.is_empty())
    }
}

/// Resolve the default state directory.
///
/// Checks `$XDG_STATE_HOME/drivegate`, then `$HOME/.local/state/drivegate`.
pub fn state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("drivegate");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/drivegate");
    }
    PathBuf::from(".drivegate")
}

pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
