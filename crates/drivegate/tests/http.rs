// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the drive HTTP API.
//!
//! Uses `axum_test::TestServer` in front of the router, with a local mock
//! standing in for Google's token endpoint and the Drive API.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use base64::Engine;

use drivegate::credential::epoch_secs;
use drivegate::drive::MAX_UPLOAD_BYTES;
use drivegate::state::AppState;
use drivegate::test_support::{http_client, token_json, valid_token, AppStateBuilder, MockProvider};
use drivegate::transport::build_router;

fn test_server(state: Arc<AppState>) -> anyhow::Result<TestServer> {
    Ok(TestServer::new(build_router(state))?)
}

async fn connected(provider: &MockProvider) -> anyhow::Result<Arc<AppState>> {
    AppStateBuilder::new()
        .provider(provider)
        .credentials("client-id", "client-secret")
        .token(valid_token("access"))
        .build()
        .await
}

// -- Health & status ----------------------------------------------------------

#[tokio::test]
async fn health_is_public() -> anyhow::Result<()> {
    let state = AppStateBuilder::new().auth_token("admin").build().await?;
    let server = test_server(state)?;

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "running");
    assert_eq!(body["authenticated"], false);
    Ok(())
}

#[tokio::test]
async fn status_reports_connection() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server.get("/drive/status").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["has_credentials"], true);
    assert_eq!(body["auth_status"], true);
    assert_eq!(body["has_refresh_token"], true);
    assert_eq!(body["redirect_uri"], "http://drivegate.test/drive/callback");
    assert!(body["expires_in_secs"].as_u64().is_some_and(|s| s > 0));
    assert_eq!(provider.token_calls(), 0);
    Ok(())
}

// -- Admin gate ---------------------------------------------------------------

#[tokio::test]
async fn admin_endpoints_require_bearer() -> anyhow::Result<()> {
    let state = AppStateBuilder::new().auth_token("admin-secret").build().await?;
    let server = test_server(state)?;

    let resp = server.get("/drive/status").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = server.get("/drive/status").authorization_bearer("wrong").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);

    let resp = server.get("/drive/status").authorization_bearer("admin-secret").await;
    resp.assert_status_ok();
    Ok(())
}

#[tokio::test]
async fn callback_is_exempt_from_admin_gate() -> anyhow::Result<()> {
    let state = AppStateBuilder::new().auth_token("admin-secret").build().await?;
    let server = test_server(state)?;

    // Reaches the handler (400 page) rather than the gate (401 JSON).
    let resp = server.get("/drive/callback").add_query_param("error", "access_denied").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert!(resp.text().contains("access_denied"));
    Ok(())
}

// -- Credentials & authorization ----------------------------------------------

#[tokio::test]
async fn save_credentials_rejects_empty_fields() -> anyhow::Result<()> {
    let state = AppStateBuilder::new().build().await?;
    let server = test_server(Arc::clone(&state))?;

    let resp = server
        .post("/drive/save-credentials")
        .json(&serde_json::json!({ "client_id": "  ", "client_secret": "secret" }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(!state.store.get_credentials().await.is_configured());
    Ok(())
}

#[tokio::test]
async fn save_credentials_then_start_auth() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let state = AppStateBuilder::new().provider(&provider).build().await?;
    let server = test_server(Arc::clone(&state))?;

    let resp = server.post("/drive/auth").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "NOT_CONFIGURED");

    let resp = server
        .post("/drive/save-credentials")
        .json(&serde_json::json!({ "client_id": " my-client ", "client_secret": "shh" }))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(state.store.get_credentials().await.client_id, "my-client");

    let resp = server.post("/drive/auth").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    let auth_url = body["auth_url"].as_str().unwrap_or_default();
    assert!(auth_url.starts_with(&format!("{}/auth?", provider.base_url())), "{auth_url}");
    assert!(auth_url.contains("client_id=my-client"));
    assert!(auth_url.contains("access_type=offline"));
    Ok(())
}

#[tokio::test]
async fn callback_success_redirects_to_admin() -> anyhow::Result<()> {
    let provider = MockProvider::builder()
        .token_response(200, token_json("fresh", Some("refresh"), Some(3600)))
        .start()
        .await?;
    let state = AppStateBuilder::new()
        .provider(&provider)
        .credentials("client-id", "client-secret")
        .admin_url("http://app.test/wp-admin/admin.php?page=drive")
        .build()
        .await?;
    let server = test_server(Arc::clone(&state))?;

    let before = epoch_secs();
    let resp = server.get("/drive/callback").add_query_param("code", "4/abc").await;
    resp.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        resp.header("location"),
        "http://app.test/wp-admin/admin.php?page=drive&auth=success"
    );

    let token = state.store.get_token_set().await.ok_or_else(|| anyhow::anyhow!("no token"))?;
    assert_eq!(token.access_token, "fresh");
    assert!(token.expires_at >= before + 3600);
    Ok(())
}

#[tokio::test]
async fn callback_exchange_failure_renders_page() -> anyhow::Result<()> {
    let error_body = serde_json::json!({
        "error": "invalid_grant",
        "error_description": "Bad <code>"
    })
    .to_string();
    let provider = MockProvider::builder().token_response(400, error_body).start().await?;
    let state = AppStateBuilder::new()
        .provider(&provider)
        .credentials("client-id", "client-secret")
        .build()
        .await?;
    let server = test_server(Arc::clone(&state))?;

    let resp = server.get("/drive/callback").add_query_param("code", "stale").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let page = resp.text();
    assert!(page.contains("Bad &lt;code&gt;"), "{page}");
    assert!(state.store.get_token_set().await.is_none());
    Ok(())
}

// -- File operations ----------------------------------------------------------

#[tokio::test]
async fn files_without_token_is_unauthenticated() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let state = AppStateBuilder::new()
        .provider(&provider)
        .credentials("client-id", "client-secret")
        .build()
        .await?;
    let server = test_server(state)?;

    let resp = server.get("/drive/files").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    assert_eq!(provider.drive_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn list_files_returns_page() -> anyhow::Result<()> {
    let provider = MockProvider::builder()
        .file("f1", "a.txt", "text/plain", b"aaa")
        .file("f2", "b.txt", "text/plain", b"bb")
        .next_page_token("more")
        .start()
        .await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server.get("/drive/files").add_query_param("page_size", "abc").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["files"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["files"][0]["mimeType"], "text/plain");
    assert_eq!(body["files"][0]["size"], 3);
    assert_eq!(body["next_page_token"], "more");

    let requests = provider.drive_requests().await;
    assert_eq!(requests[0].query.get("pageSize").map(String::as_str), Some("20"));
    Ok(())
}

#[tokio::test]
async fn upload_via_multipart() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let server = test_server(connected(&provider).await?)?;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello drive".to_vec()).file_name("greeting.txt").mime_type("text/plain"),
    );
    let resp = server.post("/drive/upload").multipart(form).await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["file"]["name"], "greeting.txt");
    assert_eq!(body["file"]["mimeType"], "text/plain");
    assert_eq!(body["file"]["size"], 11);

    let id = body["file"]["id"].as_str().unwrap_or_default();
    let stored = provider.file(id).await.ok_or_else(|| anyhow::anyhow!("not uploaded"))?;
    assert_eq!(stored.content, b"hello drive");
    Ok(())
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let server = test_server(connected(&provider).await?)?;

    let form = MultipartForm::new().add_text("note", "no file here");
    let resp = server.post("/drive/upload").multipart(form).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["message"], "no file provided");
    assert_eq!(provider.drive_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn upload_over_limit_is_413() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let server = test_server(connected(&provider).await?)?;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; MAX_UPLOAD_BYTES + 1]).file_name("big.bin"),
    );
    let resp = server.post("/drive/upload").multipart(form).await;
    resp.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(provider.drive_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn download_returns_base64_content() -> anyhow::Result<()> {
    let provider = MockProvider::builder()
        .file("doc-9", "report.csv", "text/csv", b"a,b\n1,2\n")
        .start()
        .await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server.get("/drive/download").add_query_param("file_id", "doc-9").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "report.csv");
    assert_eq!(body["mimeType"], "text/csv");
    assert_eq!(body["size"], 8);
    let content = base64::engine::general_purpose::STANDARD
        .decode(body["content"].as_str().unwrap_or_default())?;
    assert_eq!(content, b"a,b\n1,2\n");
    Ok(())
}

#[tokio::test]
async fn download_unknown_file_is_404() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server.get("/drive/download").add_query_param("file_id", "ghost").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn create_folder_round_trip() -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server
        .post("/drive/create-folder")
        .json(&serde_json::json!({ "name": "" }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);

    let resp = server
        .post("/drive/create-folder")
        .json(&serde_json::json!({ "name": "Invoices" }))
        .await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["folder"]["name"], "Invoices");
    assert_eq!(body["folder"]["mimeType"], "application/vnd.google-apps.folder");
    assert!(body["folder"]["webViewLink"].is_string());
    Ok(())
}

#[tokio::test]
async fn remote_failure_is_500_with_provider_message() -> anyhow::Result<()> {
    let provider = MockProvider::builder()
        .drive_failure(503, "The service is currently unavailable.")
        .start()
        .await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server.get("/drive/files").await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "REMOTE_API_ERROR");
    assert_eq!(body["error"]["message"], "The service is currently unavailable.");
    Ok(())
}

#[tokio::test]
async fn revoked_token_surfaces_provider_message() -> anyhow::Result<()> {
    let provider = MockProvider::builder().drive_failure(401, "Invalid Credentials").start().await?;
    let server = test_server(connected(&provider).await?)?;

    let resp = server.get("/drive/files").await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "REMOTE_API_ERROR");
    assert_eq!(body["error"]["message"], "Invalid Credentials");
    assert_eq!(provider.token_calls(), 0);
    Ok(())
}

#[yare::parameterized(
    credentials = { "/drive/save-credentials" },
    folder      = { "/drive/create-folder" },
)]
#[test_macro(tokio::test)]
async fn non_json_body_gets_error_envelope(path: &str) -> anyhow::Result<()> {
    let provider = MockProvider::builder().start().await?;
    let state = connected(&provider).await?;
    let server = test_server(Arc::clone(&state))?;

    let resp = server.post(path).text("client_id=a&client_secret=b&name=c").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().is_some_and(|m| m.starts_with("invalid JSON body")));
    assert_eq!(provider.drive_calls(), 0);

    let resp = server.post(path).json(&serde_json::json!({ "name": 7 })).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn serve_stops_when_state_shutdown_is_cancelled() -> anyhow::Result<()> {
    let state = AppStateBuilder::new().build().await?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(drivegate::serve(listener, Arc::clone(&state)));

    let client = http_client()?;
    let resp = client.get(format!("http://{addr}/health")).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    state.shutdown.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(5), server).await???;
    assert!(client.get(format!("http://{addr}/health")).send().await.is_err());
    Ok(())
}
