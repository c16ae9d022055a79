//! The media library: one chosen directory, its listing and a player.
//!
//! Ties the capability store, scanner and player together the way the
//! command line drives them: restore or request access, scan, then play an
//! entry by index.

use localreel_common::{DeliveryMode, DirectoryCapability, Error, Result, SessionId};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use crate::capability::CapabilityStore;
use crate::events::{StatusBus, StatusPayload};
use crate::playback::Player;
use crate::scanner::{DirectoryScanner, Listing};

pub struct Library {
    store: CapabilityStore,
    scanner: DirectoryScanner,
    player: Player,
    status: Arc<StatusBus>,
    capability: RwLock<Option<DirectoryCapability>>,
}

impl Library {
    /// Assemble a library. Store, scanner and player should publish to `status`.
    pub fn new(
        store: CapabilityStore,
        scanner: DirectoryScanner,
        player: Player,
        status: Arc<StatusBus>,
    ) -> Self {
        Self {
            store,
            scanner,
            player,
            status,
            capability: RwLock::new(None),
        }
    }

    /// Restore the saved directory and scan it.
    ///
    /// Returns `None` when nothing usable was saved. If storage itself is
    /// unavailable the user is asked to choose a directory instead.
    pub async fn initialize(&self) -> Result<Option<Listing>> {
        let capability = match self.store.load().await {
            Ok(Some(capability)) => capability,
            Ok(None) => {
                info!("No saved directory");
                return Ok(None);
            }
            Err(e) if e.is_storage_unavailable() => {
                warn!("Saved directory unavailable, asking again: {}", e);
                self.store.request().await?
            }
            Err(e) => return Err(e),
        };

        self.use_capability(capability).await.map(Some)
    }

    /// Ask the user for a directory, remember it and scan it.
    pub async fn select_directory(&self) -> Result<Listing> {
        let capability = self.store.request().await?;
        self.use_capability(capability).await
    }

    /// Rescan the current directory.
    pub async fn scan(&self) -> Result<Listing> {
        let capability = self.capability.read().clone();
        self.scanner.scan(capability.as_ref()).await
    }

    /// Play the entry at `index` in the current listing.
    pub async fn play(&self, index: usize, mode: DeliveryMode) -> Result<SessionId> {
        let entry = self.scanner.entry(index)?;
        self.player.play(entry, mode).await
    }

    /// Forget the saved directory and clear the current one.
    pub fn forget(&self) -> Result<bool> {
        self.capability.write().take();
        self.store.forget()
    }

    pub fn capability(&self) -> Option<DirectoryCapability> {
        self.capability.read().clone()
    }

    pub fn entries(&self) -> Listing {
        self.scanner.entries()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn status(&self) -> &Arc<StatusBus> {
        &self.status
    }

    async fn use_capability(&self, capability: DirectoryCapability) -> Result<Listing> {
        if !capability.permission.is_granted() {
            let err = Error::NoCapability;
            self.status.publish(StatusPayload::Failed {
                message: err.to_string(),
            });
            return Err(err);
        }
        let listing = self.scanner.scan(Some(&capability)).await?;
        *self.capability.write() = Some(capability);
        Ok(listing)
    }
}
