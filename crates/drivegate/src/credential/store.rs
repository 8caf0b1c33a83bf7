// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: client credentials and the token record, held in memory
//! and mirrored to JSON files with atomic writes.
//!
//! The two records are independent. Replacing the client credentials leaves
//! a stored token in place.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::credential::{OAuthClientCredentials, TokenSet};
use crate::error::DriveError;

const CLIENT_FILE: &str = "client.json";
const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Default)]
struct Slots {
    credentials: OAuthClientCredentials,
    token: Option<TokenSet>,
}

/// Persistent home of the OAuth client credentials and the active token set.
pub struct CredentialStore {
    dir: Option<PathBuf>,
    slots: RwLock<Slots>,
}

impl CredentialStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self { dir: None, slots: RwLock::new(Slots::default()) }
    }

    /// Open a store backed by `dir`, loading whatever records already exist.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let credentials = read_json(&dir.join(CLIENT_FILE)).unwrap_or_default();
        let token: Option<TokenSet> = read_json(&dir.join(TOKEN_FILE));
        if token.is_some() {
            info!(dir = %dir.display(), "loaded persisted token");
        }
        Self { dir: Some(dir), slots: RwLock::new(Slots { credentials, token }) }
    }

    /// Current client credentials (empty fields when unset).
    pub async fn get_credentials(&self) -> OAuthClientCredentials {
        self.slots.read().await.credentials.clone()
    }

    /// Replace the client credentials.
    ///
    /// Both values are trimmed and stripped of control characters first;
    /// if either ends up empty nothing is written.
    pub async fn save_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), DriveError> {
        let client_id = sanitize_text(client_id);
        let client_secret = sanitize_text(client_secret);
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(DriveError::validation("Client ID and Client Secret are required"));
        }

        let mut slots = self.slots.write().await;
        slots.credentials = OAuthClientCredentials { client_id, client_secret };
        self.persist(CLIENT_FILE, &slots.credentials);
        info!("client credentials saved");
        Ok(())
    }

    pub async fn get_token_set(&self) -> Option<TokenSet> {
        self.slots.read().await.token.clone()
    }

    /// Overwrite the token record as a whole.
    pub async fn save_token_set(&self, token: TokenSet) {
        let mut slots = self.slots.write().await;
        self.persist(TOKEN_FILE, &token);
        slots.token = Some(token);
    }

    /// Expiry of the stored token as epoch seconds, 0 when no token exists.
    pub async fn get_token_expiry(&self) -> u64 {
        self.slots.read().await.token.as_ref().map(|t| t.expires_at).unwrap_or(0)
    }

    fn persist<T: Serialize>(&self, file: &str, value: &T) {
        let Some(ref dir) = self.dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), "failed to create state dir: {e}");
            return;
        }
        let path = dir.join(file);
        match write_json_atomic(&path, value) {
            Ok(()) => debug!(path = %path.display(), "persisted"),
            Err(e) => warn!(path = %path.display(), "failed to persist: {e}"),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            debug!(path = %path.display(), "nothing persisted: {e}");
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), "ignoring unparsable state file: {e}");
            None
        }
    }
}

/// Write JSON atomically (unique tmp file + rename).
///
/// The tmp name carries PID and a counter so concurrent writers never share
/// a scratch file.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(value)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Trim and drop control characters from a free-text admin input.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_control()).collect::<String>().trim().to_owned()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
