// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth token-endpoint wire types and helpers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scopes requested from the provider.
pub const DRIVE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Standard OAuth2 token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// OAuth2 error response (`{"error": ..., "error_description": ...}`).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Why a token-endpoint request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRequestError {
    /// The provider answered with an OAuth error body.
    Provider { error: String, description: Option<String> },
    /// The request never produced a response.
    Transport(String),
    /// The response could not be understood.
    Malformed(String),
}

impl TokenRequestError {
    /// Most useful human-readable reason: the description when the provider sent one.
    pub fn reason(&self) -> String {
        match self {
            Self::Provider { error, description } => {
                description.clone().filter(|d| !d.is_empty()).unwrap_or_else(|| error.clone())
            }
            Self::Transport(msg) | Self::Malformed(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for TokenRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { error, description: Some(d) } => write!(f, "{error}: {d}"),
            Self::Provider { error, description: None } => f.write_str(error),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for TokenRequestError {}

/// POST a form to the token endpoint and parse the token response.
///
/// An `error` field is honoured regardless of HTTP status.
pub async fn request_token(
    http: &reqwest::Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse, TokenRequestError> {
    let resp = http
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|e| TokenRequestError::Transport(e.to_string()))?;

    let status = resp.status();
    let body =
        resp.text().await.map_err(|e| TokenRequestError::Transport(format!("read body: {e}")))?;

    if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
        return Err(TokenRequestError::Provider {
            error: err.error,
            description: err.error_description,
        });
    }
    if !status.is_success() {
        return Err(TokenRequestError::Malformed(format!("HTTP {status}: {body}")));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| TokenRequestError::Malformed(format!("parse response: {e}")))?;
    if token.access_token.is_empty() {
        return Err(TokenRequestError::Malformed("empty access_token".to_owned()));
    }
    Ok(token)
}

/// Build `base?k=v&...` with form-style encoding.
pub fn url_with_query(base: &str, params: &[(&str, &str)]) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{}", urlencoded(params))
}

/// Build a URL-encoded form body string.
pub fn urlencoded(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding(k), urlencoding(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Form-style encoding for URL query parameters (spaces as `+`).
fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0xf) as usize]));
            }
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
