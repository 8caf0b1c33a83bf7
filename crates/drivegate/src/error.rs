// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error codes for the drive API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthorized,
    ValidationError,
    NotConfigured,
    Unauthenticated,
    PayloadTooLarge,
    NotFound,
    RemoteApiError,
    AuthError,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::ValidationError => 400,
            Self::NotConfigured => 400,
            Self::Unauthenticated => 401,
            Self::PayloadTooLarge => 413,
            Self::NotFound => 404,
            Self::RemoteApiError => 500,
            Self::AuthError => 400,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotConfigured => "NOT_CONFIGURED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::NotFound => "NOT_FOUND",
            Self::RemoteApiError => "REMOTE_API_ERROR",
            Self::AuthError => "AUTH_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { success: false, error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Failure of a credential, OAuth, or Drive operation.
///
/// Validation and configuration failures are produced before any network
/// call. Provider failures are translated at the call site and keep the
/// provider's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveError {
    /// Bad or missing caller input.
    Validation(String),
    /// No OAuth client credentials are stored.
    NotConfigured,
    /// No usable access token and refresh was not possible.
    Unauthenticated,
    /// Upload content exceeds the size limit.
    PayloadTooLarge { size: usize, limit: usize },
    /// The provider does not know the requested resource.
    NotFound(String),
    /// Provider-side, network, or malformed-response failure.
    RemoteApi { message: String },
    /// Code exchange failed or the user denied consent.
    Auth { reason: String },
}

impl DriveError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteApi { message: message.into() }
    }

    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth { reason: reason.into() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::NotConfigured => ErrorCode::NotConfigured,
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::RemoteApi { .. } => ErrorCode::RemoteApiError,
            Self::Auth { .. } => ErrorCode::AuthError,
        }
    }

    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        self.code().to_http_response(self.to_string())
    }
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => f.write_str(msg),
            Self::NotConfigured => f.write_str("Google OAuth credentials not configured"),
            Self::Unauthenticated => f.write_str("Not authenticated with Google Drive"),
            Self::PayloadTooLarge { size, limit } => {
                write!(f, "file too large: {size} bytes (max {limit})")
            }
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::RemoteApi { message } => f.write_str(message),
            Self::Auth { reason } => write!(f, "authorization failed: {reason}"),
        }
    }
}

impl std::error::Error for DriveError {}

impl IntoResponse for DriveError {
    fn into_response(self) -> Response {
        self.to_http_response().into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
