// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated Drive v3 REST calls.
//!
//! Every provider failure is translated here: 404 becomes `NotFound`,
//! anything else `RemoteApi` carrying Google's own message when the body
//! has one.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::credential::oauth::url_with_query;
use crate::drive::{DriveClientContext, DriveFileRef, FileList, FOLDER_MIME_TYPE};
use crate::error::DriveError;

const LIST_FIELDS: &str = "files(id,name,mimeType,size,modifiedTime,webViewLink),nextPageToken";
const UPLOAD_FIELDS: &str = "id,name,mimeType,size,webViewLink";
const METADATA_FIELDS: &str = "id,name,mimeType,size";
const FOLDER_FIELDS: &str = "id,name,mimeType,webViewLink";

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

impl DriveClientContext {
    pub async fn list(
        &self,
        page_size: u32,
        page_token: Option<&str>,
        query: &str,
    ) -> Result<FileList, DriveError> {
        let page_size = page_size.to_string();
        let mut params =
            vec![("pageSize", page_size.as_str()), ("q", query), ("fields", LIST_FIELDS)];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let url = url_with_query(&format!("{}/files", self.endpoints.api_base), &params);
        debug!(page_size = %page_size, query, "drive list");
        let resp = self.send(self.http.get(url)).await?;
        parse_json(resp).await
    }

    pub async fn get_metadata(&self, file_id: &str) -> Result<DriveFileRef, DriveError> {
        let url = url_with_query(&self.file_url(file_id), &[("fields", METADATA_FIELDS)]);
        debug!(file_id, "drive metadata");
        let resp = self.send(self.http.get(url)).await?;
        parse_json(resp).await
    }

    pub async fn get_media(&self, file_id: &str) -> Result<Bytes, DriveError> {
        let url = url_with_query(&self.file_url(file_id), &[("alt", "media")]);
        debug!(file_id, "drive media");
        let resp = self.send(self.http.get(url)).await?;
        resp.bytes().await.map_err(|e| DriveError::remote(format!("read file content: {e}")))
    }

    /// Metadata and content in one `multipart/related` request.
    pub async fn upload_multipart(
        &self,
        name: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<DriveFileRef, DriveError> {
        let metadata = serde_json::json!({ "name": name, "mimeType": mime_type }).to_string();
        let boundary = format!("drivegate_{}", uuid::Uuid::new_v4().simple());
        let body = related_body(&boundary, &metadata, mime_type, content);

        let url = url_with_query(
            &format!("{}/files", self.endpoints.upload_base),
            &[("uploadType", "multipart"), ("fields", UPLOAD_FIELDS)],
        );
        debug!(name, mime_type, bytes = content.len(), "drive upload");
        let req = self
            .http
            .post(url)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body);
        let resp = self.send(req).await?;
        parse_json(resp).await
    }

    pub async fn create_folder(&self, name: &str) -> Result<DriveFileRef, DriveError> {
        let url = url_with_query(
            &format!("{}/files", self.endpoints.api_base),
            &[("fields", FOLDER_FIELDS)],
        );
        debug!(name, "drive create folder");
        let metadata = serde_json::json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        let resp = self.send(self.http.post(url).json(&metadata)).await?;
        parse_json(resp).await
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{file_id}", self.endpoints.api_base)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, DriveError> {
        let resp = req
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| DriveError::remote(format!("Drive request failed: {e}")))?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(classify(resp).await)
        }
    }
}

async fn parse_json<T: DeserializeOwned>(resp: Response) -> Result<T, DriveError> {
    resp.json::<T>().await.map_err(|e| DriveError::remote(format!("malformed Drive response: {e}")))
}

async fn classify(resp: Response) -> DriveError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Drive API returned HTTP {status}"));

    match status {
        StatusCode::NOT_FOUND => DriveError::NotFound(message),
        _ => {
            warn!(%status, "Drive request failed: {message}");
            DriveError::remote(message)
        }
    }
}

fn related_body(boundary: &str, metadata: &str, mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());
    body
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
