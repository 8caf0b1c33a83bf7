// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the drive proxy.

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::drive::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for multipart framing around a maximum-size upload, so the size
/// check happens in the facade rather than in the body reader.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

/// Build the axum `Router` with all drive routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public
        .route("/health", get(http::health))
        .route("/drive/callback", get(http::oauth_callback))
        // Setup
        .route("/drive/status", get(http::drive_status))
        .route("/drive/save-credentials", post(http::save_credentials))
        .route("/drive/auth", post(http::start_auth))
        // File operations
        .route("/drive/files", get(http::list_files))
        .route(
            "/drive/upload",
            post(http::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/drive/download", get(http::download_file))
        .route("/drive/create-folder", post(http::create_folder))
        // Middleware
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
