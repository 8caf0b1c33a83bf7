// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Google Drive v3 access: wire types, the per-request client context, and
//! the facade that gates every call on a usable token.

pub mod client;
pub mod facade;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Endpoints;

/// Reserved MIME type marking a Drive folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
/// MIME type used when an upload does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
/// Largest accepted upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Drive rejects larger pages.
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_QUERY: &str = "trashed=false";

/// Read-only projection of a remote file. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, deserialize_with = "size_field", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// Drive encodes int64 fields as decimal strings.
fn size_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One page of a file listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFileRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Raw content plus the metadata needed to save it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub content: Bytes,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Caller-supplied listing options, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page_size: Option<i64>,
    pub page_token: Option<String>,
    pub query: Option<String>,
}

impl ListParams {
    /// Non-positive or missing sizes fall back to the default; capped at the Drive maximum.
    pub fn page_size(&self) -> u32 {
        match self.page_size {
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn query(&self) -> &str {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()).unwrap_or(DEFAULT_QUERY)
    }
}

/// Everything one remote call needs, built fresh from the current store
/// contents for each facade operation.
#[derive(Debug, Clone)]
pub struct DriveClientContext {
    http: reqwest::Client,
    endpoints: Endpoints,
    access_token: String,
}

impl DriveClientContext {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, access_token: String) -> Self {
        Self { http, endpoints, access_token }
    }
}
