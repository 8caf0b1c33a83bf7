// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Google OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Drive API v3 metadata base.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Drive API v3 upload base.
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Configuration for the drivegate server.
#[derive(Debug, Clone, Parser)]
#[command(name = "drivegate", version, about = "Single-account Google Drive proxy")]
pub struct DriveConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "DRIVEGATE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9810, env = "DRIVEGATE_PORT")]
    pub port: u16,

    /// Bearer token required on admin endpoints. If unset, admin auth is disabled.
    #[arg(long, env = "DRIVEGATE_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Public base URL of this service. The OAuth redirect URI is derived from it.
    #[arg(long, default_value = "http://127.0.0.1:9810", env = "DRIVEGATE_BASE_URL")]
    pub base_url: String,

    /// Admin UI location the OAuth callback redirects to. Defaults to `<base-url>/admin/drive`.
    #[arg(long, env = "DRIVEGATE_ADMIN_URL")]
    pub admin_url: Option<String>,

    /// Directory holding persisted client credentials and tokens.
    #[arg(long, env = "DRIVEGATE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Timeout for every outbound provider request, in seconds.
    #[arg(long, default_value_t = 30, env = "DRIVEGATE_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: u64,

    /// OAuth authorization endpoint.
    #[arg(long, default_value = GOOGLE_AUTH_URL, env = "DRIVEGATE_AUTH_ENDPOINT")]
    pub auth_endpoint: String,

    /// OAuth token endpoint.
    #[arg(long, default_value = GOOGLE_TOKEN_URL, env = "DRIVEGATE_TOKEN_ENDPOINT")]
    pub token_endpoint: String,

    /// Drive metadata API base URL.
    #[arg(long, default_value = DRIVE_API_BASE, env = "DRIVEGATE_API_BASE")]
    pub api_base: String,

    /// Drive upload API base URL.
    #[arg(long, default_value = DRIVE_UPLOAD_BASE, env = "DRIVEGATE_UPLOAD_BASE")]
    pub upload_base: String,

    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[arg(long, default_value = "info", env = "DRIVEGATE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: text or json.
    #[arg(long, default_value = "text", env = "DRIVEGATE_LOG_FORMAT")]
    pub log_format: String,
}

impl DriveConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http_timeout_secs == 0 {
            anyhow::bail!("--http-timeout-secs must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            anyhow::bail!("--log-format must be 'text' or 'json', got '{}'", self.log_format);
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("--base-url must be an http(s) URL, got '{}'", self.base_url);
        }
        Ok(())
    }

    /// OAuth redirect URI registered with the provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}/drive/callback", self.base_url.trim_end_matches('/'))
    }

    /// Where the browser lands after a successful authorization.
    pub fn admin_url(&self) -> String {
        match self.admin_url {
            Some(ref url) => url.clone(),
            None => format!("{}/admin/drive", self.base_url.trim_end_matches('/')),
        }
    }

    /// Resolved state directory (explicit flag, else XDG default).
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(crate::credential::state_dir)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Provider endpoints bundled for the OAuth and Drive layers.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            auth_url: self.auth_endpoint.clone(),
            token_url: self.token_endpoint.clone(),
            api_base: self.api_base.trim_end_matches('/').to_owned(),
            upload_base: self.upload_base.trim_end_matches('/').to_owned(),
        }
    }
}

/// Remote endpoints the service talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    pub upload_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_owned(),
            token_url: GOOGLE_TOKEN_URL.to_owned(),
            api_base: DRIVE_API_BASE.to_owned(),
            upload_base: DRIVE_UPLOAD_BASE.to_owned(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
