//! Directory scanner.
//!
//! Lists the media files directly inside the chosen directory. Each scan
//! builds a fresh listing off to the side and swaps it in only once it is
//! complete, so readers never see a half-built list.

use bytes::Bytes;
use localreel_common::{paths::media_kind_of_name, DirectoryCapability, Error, MediaKind, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::events::{StatusBus, StatusPayload};

/// Read access to one listed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCapability {
    path: PathBuf,
    size: u64,
}

impl FileCapability {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size at scan time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open the file for windowed reads.
    pub async fn open(&self) -> Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| Error::read_failure(&self.path, e))
    }

    /// Read the whole file into memory.
    pub async fn read_all(&self) -> Result<Bytes> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|e| Error::read_failure(&self.path, e))
    }
}

/// One discovered media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub name: String,
    pub kind: MediaKind,
    pub file: FileCapability,
}

/// A complete listing, in directory enumeration order.
pub type Listing = Arc<[Arc<MediaEntry>]>;

/// Scans the chosen directory and holds the latest listing.
pub struct DirectoryScanner {
    listing: RwLock<Listing>,
    scanning: tokio::sync::Mutex<()>,
    status: Option<Arc<StatusBus>>,
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self {
            listing: RwLock::new(Arc::from(Vec::new())),
            scanning: tokio::sync::Mutex::new(()),
            status: None,
        }
    }

    /// Publish the file count after each scan.
    pub fn with_status(mut self, status: Arc<StatusBus>) -> Self {
        self.status = Some(status);
        self
    }

    /// List the media files directly inside the capability's directory.
    ///
    /// Subdirectories are skipped, not descended into. On failure the
    /// previous listing stays in place and the error is published.
    pub async fn scan(&self, capability: Option<&DirectoryCapability>) -> Result<Listing> {
        let result = self.rescan(capability).await;
        if let Err(e) = &result {
            warn!("Scan failed: {}", e);
            if let Some(status) = &self.status {
                status.publish(StatusPayload::Failed {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn rescan(&self, capability: Option<&DirectoryCapability>) -> Result<Listing> {
        let capability = capability.ok_or(Error::NoCapability)?;
        let _guard = self.scanning.lock().await;

        let root = capability.root.clone();
        let entries = tokio::task::spawn_blocking(move || list_directory(&root))
            .await
            .map_err(|e| Error::internal(format!("Scan task failed: {}", e)))??;

        let listing: Listing = entries.into_iter().map(Arc::new).collect();
        *self.listing.write() = Arc::clone(&listing);

        info!("Scanned {:?}: {} media files", capability.root, listing.len());
        if let Some(status) = &self.status {
            status.publish(StatusPayload::ScanComplete {
                count: listing.len(),
            });
        }

        Ok(listing)
    }

    /// The current listing.
    pub fn entries(&self) -> Listing {
        Arc::clone(&self.listing.read())
    }

    /// The entry at `index` in the current listing.
    pub fn entry(&self, index: usize) -> Result<Arc<MediaEntry>> {
        let listing = self.listing.read();
        listing
            .get(index)
            .cloned()
            .ok_or(Error::InvalidIndex {
                index,
                len: listing.len(),
            })
    }
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn list_directory(root: &Path) -> Result<Vec<MediaEntry>> {
    let meta = std::fs::metadata(root).map_err(|e| Error::read_failure(root, e))?;
    if !meta.is_dir() {
        return Err(Error::invalid_input(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut entries = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                return Err(Error::read_failure(root, source));
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(kind) = media_kind_of_name(&name) else {
            debug!("Skipping non-media file: {}", name);
            continue;
        };

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                continue;
            }
        };

        entries.push(MediaEntry {
            name,
            kind,
            file: FileCapability {
                path: entry.into_path(),
                size,
            },
        });
    }

    Ok(entries)
}
