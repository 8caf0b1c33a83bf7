// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the drive proxy.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::credential::flow::CallbackParams;
use crate::credential::lifecycle::AuthStatus;
use crate::drive::{DriveFileRef, ListParams};
use crate::error::{DriveError, ErrorCode};
use crate::state::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: AuthStatus,
    pub redirect_uri: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveCredentialsRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub success: bool,
    pub auth_url: String,
}

/// Raw listing query. Sizes are parsed leniently: anything non-numeric
/// falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page_size: Option<String>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

impl From<ListQuery> for ListParams {
    fn from(q: ListQuery) -> Self {
        Self {
            page_size: q.page_size.and_then(|s| s.trim().parse().ok()),
            page_token: q.page_token,
            query: q.query,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub files: Vec<DriveFileRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub success: bool,
    pub file: DriveFileRef,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub file_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub success: bool,
    /// Base64 (standard alphabet).
    pub content: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FolderResponse {
    pub success: bool,
    pub folder: DriveFileRef,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    let status = s.tokens.status().await;
    Json(HealthResponse { status: "running".to_owned(), authenticated: status.auth_status })
}

/// `GET /drive/status`: connection state for the admin page. No network.
pub async fn drive_status(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    let status = s.tokens.status().await;
    Json(StatusResponse { success: true, status, redirect_uri: s.flow.redirect_uri().to_owned() })
}

/// `POST /drive/save-credentials`
pub async fn save_credentials(
    State(s): State<Arc<AppState>>,
    body: Result<Json<SaveCredentialsRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, DriveError> {
    let Json(req) = body.map_err(json_error)?;
    s.store.save_credentials(&req.client_id, &req.client_secret).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Credentials saved successfully".to_owned(),
    }))
}

/// `POST /drive/auth`: consent URL for the browser to visit.
pub async fn start_auth(
    State(s): State<Arc<AppState>>,
) -> Result<Json<AuthUrlResponse>, DriveError> {
    let auth_url = s.flow.build_authorization_url().await?;
    Ok(Json(AuthUrlResponse { success: true, auth_url }))
}

/// `GET /drive/callback`: provider redirect target.
///
/// Reached by a browser, so failures render a page instead of JSON.
pub async fn oauth_callback(
    State(s): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match s.flow.handle_callback(&params).await {
        Ok(_) => Redirect::to(&success_url(&s.config.admin_url())).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Html(failure_page(&e))).into_response(),
    }
}

/// `GET /drive/files`
pub async fn list_files(
    State(s): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, DriveError> {
    let list = s.drive.list_files(&ListParams::from(query)).await?;
    Ok(Json(ListResponse {
        success: true,
        files: list.files,
        next_page_token: list.next_page_token,
    }))
}

/// `POST /drive/upload`: multipart form with a `file` field.
pub async fn upload_file(State(s): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_owned();
        let mime_type = field.content_type().unwrap_or_default().to_owned();
        let content = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return multipart_error(e),
        };
        return match s.drive.upload_file(&name, &mime_type, content).await {
            Ok(file) => Json(FileResponse { success: true, file }).into_response(),
            Err(e) => e.into_response(),
        };
    }
    DriveError::validation("no file provided").into_response()
}

/// `GET /drive/download?file_id=...`
pub async fn download_file(
    State(s): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<DownloadResponse>, DriveError> {
    let file = s.drive.download_file(&query.file_id).await?;
    Ok(Json(DownloadResponse {
        success: true,
        content: base64::engine::general_purpose::STANDARD.encode(&file.content),
        filename: file.filename,
        mime_type: file.mime_type,
        size: file.size,
    }))
}

/// `POST /drive/create-folder`
pub async fn create_folder(
    State(s): State<Arc<AppState>>,
    body: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<Json<FolderResponse>, DriveError> {
    let Json(req) = body.map_err(json_error)?;
    let folder = s.drive.create_folder(&req.name).await?;
    Ok(Json(FolderResponse { success: true, folder }))
}

// -- Helpers ------------------------------------------------------------------

fn json_error(e: JsonRejection) -> DriveError {
    DriveError::validation(format!("invalid JSON body: {}", e.body_text()))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> Response {
    warn!("rejected upload body: {e}");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ErrorCode::PayloadTooLarge.to_http_response(e.body_text()).into_response();
    }
    DriveError::validation(format!("invalid multipart body: {}", e.body_text())).into_response()
}

/// Admin URL with the `auth=success` marker appended.
pub fn success_url(admin_url: &str) -> String {
    let sep = if admin_url.contains('?') { '&' } else { '?' };
    format!("{admin_url}{sep}auth=success")
}

const FAILURE_TITLE: &str = "Google Drive authorization failed";

fn failure_page(err: &DriveError) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n",
            "<body><h1>{title}</h1>\n<p>{message}</p></body></html>\n",
        ),
        title = FAILURE_TITLE,
        message = escape_html(&err.to_string()),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
