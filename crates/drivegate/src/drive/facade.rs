// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drive operations facade.
//!
//! Inputs are validated first, then a usable token is required before any
//! remote call is attempted.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use crate::config::Endpoints;
use crate::credential::lifecycle::TokenLifecycle;
use crate::credential::store::sanitize_text;
use crate::drive::{
    DownloadedFile, DriveClientContext, DriveFileRef, FileList, ListParams, DEFAULT_MIME_TYPE,
    MAX_UPLOAD_BYTES,
};
use crate::error::DriveError;

/// Longest file name accepted (bytes).
const MAX_NAME_BYTES: usize = 255;

pub struct DriveFacade {
    tokens: Arc<TokenLifecycle>,
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl DriveFacade {
    pub fn new(tokens: Arc<TokenLifecycle>, http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { tokens, http, endpoints }
    }

    /// Build the per-call context, or fail without touching the network.
    async fn context(&self) -> Result<DriveClientContext, DriveError> {
        let token = self.tokens.usable_access_token().await.ok_or(DriveError::Unauthenticated)?;
        Ok(DriveClientContext::new(self.http.clone(), self.endpoints.clone(), token))
    }

    pub async fn list_files(&self, params: &ListParams) -> Result<FileList, DriveError> {
        let ctx = self.context().await?;
        ctx.list(params.page_size(), params.page_token(), params.query()).await
    }

    pub async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Bytes,
    ) -> Result<DriveFileRef, DriveError> {
        if content.len() > MAX_UPLOAD_BYTES {
            return Err(DriveError::PayloadTooLarge {
                size: content.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }
        let name = sanitize_file_name(name)
            .ok_or_else(|| DriveError::validation("a valid file name is required"))?;
        let mime_type = sanitize_text(mime_type);
        let mime_type = if mime_type.is_empty() { DEFAULT_MIME_TYPE } else { mime_type.as_str() };

        let ctx = self.context().await?;
        let file = ctx.upload_multipart(&name, mime_type, &content).await?;
        info!(file_id = %file.id, bytes = content.len(), "uploaded file");
        Ok(file)
    }

    /// Metadata and content are both fetched before anything is returned.
    pub async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, DriveError> {
        let file_id = file_id.trim();
        if !is_valid_file_id(file_id) {
            return Err(DriveError::validation("a valid file_id is required"));
        }

        let ctx = self.context().await?;
        let meta = ctx.get_metadata(file_id).await?;
        let content = ctx.get_media(file_id).await?;
        let size = meta.size.unwrap_or(content.len() as u64);
        Ok(DownloadedFile { content, filename: meta.name, mime_type: meta.mime_type, size })
    }

    pub async fn create_folder(&self, name: &str) -> Result<DriveFileRef, DriveError> {
        let name = sanitize_text(name);
        if name.is_empty() {
            return Err(DriveError::validation("Folder name is required"));
        }

        let ctx = self.context().await?;
        let folder = ctx.create_folder(&name).await?;
        info!(folder_id = %folder.id, "created folder");
        Ok(folder)
    }
}

/// Reduce a client-supplied name to a bare file name.
///
/// Directory components, path separators, and control characters are
/// removed; the result is capped at 255 bytes.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let unified = cleaned.replace('\\', "/");
    let name = Path::new(&unified).file_name()?.to_str()?.trim();

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    let mut end = name.len().min(MAX_NAME_BYTES);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    Some(name[..end].to_owned())
}

/// Drive ids are URL-safe base64-ish tokens.
fn is_valid_file_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
