// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a mock OAuth/Drive provider, state builders,
//! and assertion helpers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::{DriveConfig, Endpoints};
use crate::credential::store::CredentialStore;
use crate::credential::{epoch_secs, TokenSet};
use crate::state::{build_http_client, AppState};

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// HTTP client for tests, with the process TLS provider installed.
pub fn http_client() -> anyhow::Result<reqwest::Client> {
    build_http_client(Duration::from_secs(5))
}

/// Token endpoint success body.
pub fn token_json(access: &str, refresh: Option<&str>, expires_in: Option<u64>) -> String {
    let mut body = serde_json::json!({ "access_token": access, "token_type": "Bearer" });
    if let Some(rt) = refresh {
        body["refresh_token"] = rt.into();
    }
    if let Some(secs) = expires_in {
        body["expires_in"] = secs.into();
    }
    body.to_string()
}

/// A token that stays valid for the next hour.
pub fn valid_token(access: &str) -> TokenSet {
    TokenSet {
        access_token: access.to_owned(),
        refresh_token: Some("refresh".to_owned()),
        expires_at: epoch_secs() + 3600,
    }
}

/// A file known to the mock Drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    /// Google-native documents report no size.
    pub reports_size: bool,
}

/// One request received by the mock Drive endpoints.
#[derive(Debug, Clone)]
pub struct DriveRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

struct MockInner {
    token_responses: Vec<(u16, String)>,
    token_calls: AtomicU32,
    token_bodies: Mutex<Vec<String>>,
    files: Mutex<Vec<MockFile>>,
    next_page_token: Option<String>,
    drive_failure: Option<(u16, String)>,
    drive_calls: AtomicU32,
    drive_requests: Mutex<Vec<DriveRequest>>,
    next_id: AtomicU32,
}

/// Builder for [`MockProvider`].
#[derive(Default)]
pub struct MockProviderBuilder {
    token_responses: Vec<(u16, String)>,
    files: Vec<MockFile>,
    next_page_token: Option<String>,
    drive_failure: Option<(u16, String)>,
}

impl MockProviderBuilder {
    /// Queue a token endpoint response. The last one repeats once exhausted.
    pub fn token_response(mut self, status: u16, body: String) -> Self {
        self.token_responses.push((status, body));
        self
    }

    pub fn file(mut self, id: &str, name: &str, mime_type: &str, content: &[u8]) -> Self {
        self.files.push(MockFile {
            id: id.to_owned(),
            name: name.to_owned(),
            mime_type: mime_type.to_owned(),
            content: content.to_vec(),
            reports_size: true,
        });
        self
    }

    /// A file whose metadata carries no `size` field.
    pub fn native_file(mut self, id: &str, name: &str, mime_type: &str, content: &[u8]) -> Self {
        self.files.push(MockFile {
            id: id.to_owned(),
            name: name.to_owned(),
            mime_type: mime_type.to_owned(),
            content: content.to_vec(),
            reports_size: false,
        });
        self
    }

    pub fn next_page_token(mut self, token: &str) -> Self {
        self.next_page_token = Some(token.to_owned());
        self
    }

    /// Make every Drive endpoint answer with a Google error body.
    pub fn drive_failure(mut self, status: u16, message: &str) -> Self {
        self.drive_failure = Some((status, message.to_owned()));
        self
    }

    pub async fn start(self) -> anyhow::Result<MockProvider> {
        let inner = Arc::new(MockInner {
            token_responses: self.token_responses,
            token_calls: AtomicU32::new(0),
            token_bodies: Mutex::new(Vec::new()),
            files: Mutex::new(self.files),
            next_page_token: self.next_page_token,
            drive_failure: self.drive_failure,
            drive_calls: AtomicU32::new(0),
            drive_requests: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
        });

        let app = Router::new()
            .route("/token", post(mock_token))
            .route("/drive/v3/files", get(mock_list).post(mock_create))
            .route("/drive/v3/files/{id}", get(mock_get))
            .route("/upload/drive/v3/files", post(mock_upload))
            .layer(DefaultBodyLimit::disable())
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(MockProvider { addr, inner })
    }
}

/// Local stand-in for the OAuth token endpoint and the Drive v3 API.
pub struct MockProvider {
    addr: SocketAddr,
    inner: Arc<MockInner>,
}

impl MockProvider {
    pub fn builder() -> MockProviderBuilder {
        MockProviderBuilder::default()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.base_url())
    }

    pub fn endpoints(&self) -> Endpoints {
        let base = self.base_url();
        Endpoints {
            auth_url: format!("{base}/auth"),
            token_url: format!("{base}/token"),
            api_base: format!("{base}/drive/v3"),
            upload_base: format!("{base}/upload/drive/v3"),
        }
    }

    pub fn token_calls(&self) -> u32 {
        self.inner.token_calls.load(Ordering::Relaxed)
    }

    /// Form bodies posted to the token endpoint, in order.
    pub async fn token_bodies(&self) -> Vec<String> {
        self.inner.token_bodies.lock().await.clone()
    }

    pub fn drive_calls(&self) -> u32 {
        self.inner.drive_calls.load(Ordering::Relaxed)
    }

    pub async fn drive_requests(&self) -> Vec<DriveRequest> {
        self.inner.drive_requests.lock().await.clone()
    }

    pub async fn file(&self, id: &str) -> Option<MockFile> {
        self.inner.files.lock().await.iter().find(|f| f.id == id).cloned()
    }
}

async fn mock_token(State(inner): State<Arc<MockInner>>, body: String) -> (StatusCode, String) {
    let idx = inner.token_calls.fetch_add(1, Ordering::Relaxed) as usize;
    inner.token_bodies.lock().await.push(body);
    let (status, body) = inner
        .token_responses
        .get(idx)
        .or(inner.token_responses.last())
        .cloned()
        .unwrap_or((500, "{}".to_owned()));
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), body)
}

/// Record a Drive request; returns the forced failure response, if any.
async fn record_drive(
    inner: &MockInner,
    method: Method,
    uri: &Uri,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Bytes,
) -> Option<Response> {
    inner.drive_calls.fetch_add(1, Ordering::Relaxed);
    let header_str = |name: header::HeaderName| {
        headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
    };
    inner.drive_requests.lock().await.push(DriveRequest {
        method,
        path: uri.path().to_owned(),
        query,
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body,
    });
    inner.drive_failure.as_ref().map(|(status, message)| google_error(*status, message))
}

fn google_error(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "error": { "code": status.as_u16(), "message": message, "errors": [] }
    });
    (status, Json(body)).into_response()
}

fn file_json(file: &MockFile) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": file.id,
        "name": file.name,
        "mimeType": file.mime_type,
        "modifiedTime": "2026-01-01T00:00:00.000Z",
        "webViewLink": format!("https://drive.google.com/file/d/{}/view", file.id),
    });
    if file.reports_size {
        // Drive reports sizes as decimal strings.
        value["size"] = file.content.len().to_string().into();
    }
    value
}

async fn mock_list(
    State(inner): State<Arc<MockInner>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let failure = record_drive(&inner, Method::GET, &uri, query, &headers, Bytes::new()).await;
    if let Some(failure) = failure {
        return failure;
    }
    let files: Vec<_> = inner.files.lock().await.iter().map(file_json).collect();
    let mut body = serde_json::json!({ "files": files });
    if let Some(ref token) = inner.next_page_token {
        body["nextPageToken"] = token.clone().into();
    }
    Json(body).into_response()
}

async fn mock_get(
    State(inner): State<Arc<MockInner>>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let media = query.get("alt").is_some_and(|alt| alt == "media");
    let failure = record_drive(&inner, Method::GET, &uri, query, &headers, Bytes::new()).await;
    if let Some(failure) = failure {
        return failure;
    }
    let file = inner.files.lock().await.iter().find(|f| f.id == id).cloned();
    let Some(file) = file else {
        return google_error(404, &format!("File not found: {id}."));
    };
    if media {
        ([(header::CONTENT_TYPE, file.mime_type.clone())], file.content).into_response()
    } else {
        let mut meta = file_json(&file);
        if let Some(obj) = meta.as_object_mut() {
            obj.remove("modifiedTime");
            obj.remove("webViewLink");
        }
        Json(meta).into_response()
    }
}

async fn mock_create(
    State(inner): State<Arc<MockInner>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let failure = record_drive(&inner, Method::POST, &uri, query, &headers, body.clone()).await;
    if let Some(failure) = failure {
        return failure;
    }
    let Ok(meta) = serde_json::from_slice::<serde_json::Value>(&body) else {
        return google_error(400, "Invalid JSON payload");
    };
    let n = inner.next_id.fetch_add(1, Ordering::Relaxed);
    let file = MockFile {
        id: format!("folder-{n}"),
        name: meta["name"].as_str().unwrap_or_default().to_owned(),
        mime_type: meta["mimeType"].as_str().unwrap_or_default().to_owned(),
        content: Vec::new(),
        reports_size: false,
    };
    let json = file_json(&file);
    inner.files.lock().await.push(file);
    Json(json).into_response()
}

async fn mock_upload(
    State(inner): State<Arc<MockInner>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let failure = record_drive(&inner, Method::POST, &uri, query, &headers, body.clone()).await;
    if let Some(failure) = failure {
        return failure;
    }
    let boundary = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split("boundary=").nth(1))
        .map(|b| b.trim_matches('"').to_owned());
    let Some(boundary) = boundary else {
        return google_error(400, "Missing multipart boundary");
    };
    let parts = split_related(&body, &boundary);
    let [meta, content] = parts.as_slice() else {
        return google_error(400, "Expected metadata and media parts");
    };
    let Ok(meta) = serde_json::from_slice::<serde_json::Value>(meta) else {
        return google_error(400, "Invalid metadata part");
    };

    let n = inner.next_id.fetch_add(1, Ordering::Relaxed);
    let file = MockFile {
        id: format!("upload-{n}"),
        name: meta["name"].as_str().unwrap_or_default().to_owned(),
        mime_type: meta["mimeType"].as_str().unwrap_or("application/octet-stream").to_owned(),
        content: content.clone(),
        reports_size: true,
    };
    let mut json = file_json(&file);
    if let Some(obj) = json.as_object_mut() {
        obj.remove("modifiedTime");
    }
    inner.files.lock().await.push(file);
    Json(json).into_response()
}

/// Split a `multipart/related` body into part payloads (headers dropped).
pub fn split_related(body: &[u8], boundary: &str) -> Vec<Vec<u8>> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut rest = body;
    while let Some(start) = find(rest, delimiter.as_bytes()) {
        rest = &rest[start + delimiter.len()..];
        if rest.starts_with(b"--") {
            break;
        }
        let Some(end) = find(rest, delimiter.as_bytes()) else {
            break;
        };
        let part = &rest[..end];
        if let Some(split) = find(part, b"\r\n\r\n") {
            let payload = &part[split + 4..];
            let payload = payload.strip_suffix(b"\r\n").unwrap_or(payload);
            parts.push(payload.to_vec());
        }
        rest = &rest[end..];
    }
    parts
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Builder for constructing [`AppState`] in tests with sensible defaults.
pub struct AppStateBuilder {
    endpoints: Endpoints,
    auth_token: Option<String>,
    admin_url: Option<String>,
    credentials: Option<(String, String)>,
    token: Option<TokenSet>,
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            endpoints: Endpoints::default(),
            auth_token: None,
            admin_url: None,
            credentials: None,
            token: None,
        }
    }

    pub fn provider(mut self, provider: &MockProvider) -> Self {
        self.endpoints = provider.endpoints();
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn admin_url(mut self, url: impl Into<String>) -> Self {
        self.admin_url = Some(url.into());
        self
    }

    pub fn credentials(mut self, client_id: &str, client_secret: &str) -> Self {
        self.credentials = Some((client_id.to_owned(), client_secret.to_owned()));
        self
    }

    pub fn token(mut self, token: TokenSet) -> Self {
        self.token = Some(token);
        self
    }

    pub async fn build(self) -> anyhow::Result<Arc<AppState>> {
        let mut config = test_config(&self.endpoints);
        config.auth_token = self.auth_token;
        config.admin_url = self.admin_url;

        let store = Arc::new(CredentialStore::in_memory());
        if let Some((id, secret)) = self.credentials {
            store.save_credentials(&id, &secret).await?;
        }
        if let Some(token) = self.token {
            store.save_token_set(token).await;
        }
        Ok(Arc::new(AppState::new(config, store, CancellationToken::new())?))
    }
}

/// Default config pointed at the given endpoints.
pub fn test_config(endpoints: &Endpoints) -> DriveConfig {
    DriveConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        auth_token: None,
        base_url: "http://drivegate.test".to_owned(),
        admin_url: None,
        state_dir: None,
        http_timeout_secs: 5,
        auth_endpoint: endpoints.auth_url.clone(),
        token_endpoint: endpoints.token_url.clone(),
        api_base: endpoints.api_base.clone(),
        upload_base: endpoints.upload_base.clone(),
        log_level: "info".to_owned(),
        log_format: "text".to_owned(),
    }
}
