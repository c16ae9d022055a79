//! Offline cache for the application shell.
//!
//! Each cache version lives in its own directory under the cache root.
//! `install` fills the current version from a manifest, all or nothing.
//! `activate` prunes every other version. `respond` answers requests from
//! the cache and falls back to the origin, storing successful GETs on the
//! way. Media requests are never cached or answered from the cache.

mod fetch;

pub use fetch::{AssetFetcher, HttpFetcher};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use localreel_common::paths::is_media_request;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const STAGING_PREFIX: &str = ".staging-";

/// Errors from the asset cache.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid origin: {0}")]
    Origin(String),

    #[error("Invalid method: {0}")]
    Method(String),

    #[error("Fetching {path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("Corrupt cache entry: {0}")]
    Meta(#[from] serde_json::Error),
}

/// A response as stored and served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Media request, forwarded untouched.
    Passthrough,
    Cache,
    Network,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    path: String,
    status: u16,
    content_type: Option<String>,
    stored_at: DateTime<Utc>,
}

/// A versioned on-disk cache of shell assets.
#[derive(Debug, Clone)]
pub struct AssetCache {
    root: PathBuf,
    version: String,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Directory holding the current version.
    pub fn version_dir(&self) -> PathBuf {
        self.root.join(&self.version)
    }

    /// Fetch every manifest path into the current version.
    ///
    /// Any failed fetch or non-200 response aborts the install and leaves
    /// the existing version untouched.
    pub async fn install(
        &self,
        manifest: &[String],
        fetcher: &dyn AssetFetcher,
    ) -> Result<usize, AssetError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let staging = self.staging_dir("new");
        tokio::fs::create_dir(&staging).await?;

        if let Err(e) = fill(&staging, manifest, fetcher).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        if let Err(e) = self.swap_in(&staging).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        info!("Cached {} shell assets in {}", manifest.len(), self.version);
        Ok(manifest.len())
    }

    fn staging_dir(&self, role: &str) -> PathBuf {
        self.root.join(format!(
            "{}{}-{}-{}",
            STAGING_PREFIX,
            self.version,
            role,
            uuid::Uuid::new_v4()
        ))
    }

    /// Replace the current version with `staging`.
    ///
    /// The old version is moved aside first and moved back if the swap
    /// fails, so the current version is never missing.
    async fn swap_in(&self, staging: &Path) -> Result<(), AssetError> {
        let target = self.version_dir();
        if !tokio::fs::try_exists(&target).await? {
            tokio::fs::rename(staging, &target).await?;
            return Ok(());
        }

        let retired = self.staging_dir("old");
        tokio::fs::rename(&target, &retired).await?;
        if let Err(e) = tokio::fs::rename(staging, &target).await {
            if let Err(restore) = tokio::fs::rename(&retired, &target).await {
                warn!("Failed to restore {}: {}", self.version, restore);
            }
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::remove_dir_all(&retired).await {
            warn!("Failed to remove replaced cache {:?}: {}", retired, e);
        }
        Ok(())
    }

    /// Delete every cache version other than the current one.
    ///
    /// Installs still in progress are left alone. Returns the names of the
    /// deleted versions.
    pub async fn activate(&self) -> Result<Vec<String>, AssetError> {
        let mut deleted = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(deleted),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == self.version || name.starts_with(STAGING_PREFIX) {
                continue;
            }
            info!("Deleting old cache: {}", name);
            tokio::fs::remove_dir_all(entry.path()).await?;
            deleted.push(name);
        }

        Ok(deleted)
    }

    /// Look up `path` in the current version.
    pub async fn lookup(&self, path: &str) -> Result<Option<AssetResponse>, AssetError> {
        read_entry(&self.version_dir(), path).await
    }

    /// Answer a request for `path`.
    pub async fn respond(
        &self,
        method: &str,
        path: &str,
        fetcher: &dyn AssetFetcher,
    ) -> Result<(AssetResponse, Served), AssetError> {
        if is_media_request(path) {
            debug!("Passing through media request {}", path);
            return Ok((fetcher.fetch(method, path).await?, Served::Passthrough));
        }

        let is_get = method.eq_ignore_ascii_case("GET");
        if is_get {
            match self.lookup(path).await {
                Ok(Some(cached)) => return Ok((cached, Served::Cache)),
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable cache entry for {}: {}", path, e),
            }
        }

        let response = fetcher.fetch(method, path).await?;
        if is_get && response.status == 200 {
            let dir = self.version_dir();
            let stored = match tokio::fs::create_dir_all(&dir).await {
                Ok(()) => write_entry(&dir, path, &response).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = stored {
                warn!("Failed to cache {}: {}", path, e);
            }
        }

        Ok((response, Served::Network))
    }
}

async fn fill(
    dir: &Path,
    manifest: &[String],
    fetcher: &dyn AssetFetcher,
) -> Result<(), AssetError> {
    for path in manifest {
        let response = fetcher.fetch("GET", path).await?;
        if response.status != 200 {
            return Err(AssetError::Status {
                path: path.clone(),
                status: response.status,
            });
        }
        write_entry(dir, path, &response).await?;
    }
    Ok(())
}

fn entry_paths(dir: &Path, path: &str) -> (PathBuf, PathBuf) {
    let key = hex::encode(path.as_bytes());
    (
        dir.join(format!("{}.body", key)),
        dir.join(format!("{}.json", key)),
    )
}

async fn write_entry(dir: &Path, path: &str, response: &AssetResponse) -> Result<(), AssetError> {
    let (body_path, meta_path) = entry_paths(dir, path);
    let meta = EntryMeta {
        path: path.to_string(),
        status: response.status,
        content_type: response.content_type.clone(),
        stored_at: Utc::now(),
    };
    tokio::fs::write(&body_path, &response.body).await?;
    // Metadata last: an entry without it is treated as missing.
    tokio::fs::write(&meta_path, serde_json::to_vec(&meta)?).await?;
    Ok(())
}

async fn read_entry(dir: &Path, path: &str) -> Result<Option<AssetResponse>, AssetError> {
    let (body_path, meta_path) = entry_paths(dir, path);
    let meta = match tokio::fs::read(&meta_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let meta: EntryMeta = serde_json::from_slice(&meta)?;
    let body = tokio::fs::read(&body_path).await?;

    Ok(Some(AssetResponse {
        status: meta.status,
        content_type: meta.content_type,
        body: Bytes::from(body),
    }))
}
