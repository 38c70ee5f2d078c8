// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage for the OAuth credential.
//!
//! `FileTokenStore` writes a JSON record through a temporary file and an
//! atomic rename, so a crash mid-write leaves the previous record intact.

use crate::error::{AppError, Result};
use crate::models::Credential;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Storage backend for the single credential record.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist `credential`, replacing any previous record.
    async fn save(&self, credential: &Credential) -> Result<()>;

    /// Load the persisted record. Missing or unreadable storage yields `None`.
    async fn load(&self) -> Option<Credential>;
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize credential: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Persistence(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let tmp = self.temp_path();
        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &self.path).await
        };

        if let Err(e) = write.await {
            // Previous record at self.path is untouched; drop the partial temp file.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Persistence(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        tracing::debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    async fn load(&self) -> Option<Credential> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No persisted credential");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read persisted credential, ignoring"
                );
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Malformed persisted credential, ignoring"
                );
                None
            }
        }
    }
}
